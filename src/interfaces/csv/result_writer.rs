use super::instruction_reader::PaymentInstruction;
use crate::domain::payment::PaymentResponse;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    line: usize,
    operation: String,
    provider: &'a str,
    client: &'a str,
    amount: String,
    success: bool,
    status: &'static str,
    original_reference: &'a str,
    provider_reference: &'a str,
    message: &'a str,
}

/// Writes one CSV row per processed batch instruction.
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_result(
        &mut self,
        line: usize,
        instruction: &PaymentInstruction,
        response: &PaymentResponse,
    ) -> Result<()> {
        self.writer.serialize(ResultRow {
            line,
            operation: instruction.operation.to_string(),
            provider: &instruction.provider,
            client: &instruction.client,
            amount: instruction.amount.to_wire(),
            success: response.success,
            status: response.status.map(|s| s.as_str()).unwrap_or(""),
            original_reference: response.original_transaction_reference.as_deref().unwrap_or(""),
            provider_reference: response.transaction_reference.as_deref().unwrap_or(""),
            message: &response.message,
        })?;
        Ok(())
    }

    /// A row for input that never reached the orchestrator.
    pub fn write_rejected(&mut self, line: usize, message: &str) -> Result<()> {
        self.writer.serialize(ResultRow {
            line,
            operation: String::new(),
            provider: "",
            client: "",
            amount: String::new(),
            success: false,
            status: "",
            original_reference: "",
            provider_reference: "",
            message,
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
