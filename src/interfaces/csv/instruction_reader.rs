use crate::domain::money::Amount;
use crate::domain::payment::PaymentRequest;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Deposit,
    #[serde(alias = "withdrawal")]
    Withdraw,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit => f.write_str("deposit"),
            Operation::Withdraw => f.write_str("withdraw"),
        }
    }
}

/// One row of a batch file: `operation,provider,client,amount,msisdn`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentInstruction {
    pub operation: Operation,
    pub provider: String,
    pub client: String,
    pub amount: Amount,
    pub msisdn: String,
}

impl PaymentInstruction {
    pub fn to_request(&self) -> PaymentRequest {
        PaymentRequest {
            provider: self.provider.clone(),
            client_id: self.client.clone(),
            amount: self.amount,
            subscriber_msisdn: self.msisdn.clone(),
        }
    }
}

/// Reads payment instructions from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths.
pub struct InstructionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InstructionReader<R> {
    /// Creates a new `InstructionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes instructions, one `Result` per row.
    pub fn instructions(self) -> impl Iterator<Item = Result<PaymentInstruction>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
