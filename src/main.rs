use clap::Parser;
use miette::{IntoDiagnostic, Result};
use momo_gateway::application::ledger_poster::LedgerPoster;
use momo_gateway::application::orchestrator::PaymentOrchestrator;
use momo_gateway::application::token_manager::TokenManager;
use momo_gateway::config::GatewayConfig;
use momo_gateway::domain::payment::PaymentResponse;
use momo_gateway::domain::ports::{
    ClockArc, LedgerStoreArc, PaymentAdapterArc, TokenStoreArc, TransactionStore,
    TransactionStoreArc,
};
use momo_gateway::domain::transaction::ReferenceKind;
use momo_gateway::error::PaymentError;
use momo_gateway::infrastructure::btc::{BtcAdapter, BtcClient};
use momo_gateway::infrastructure::clock::SystemClock;
use momo_gateway::infrastructure::in_memory::{
    InMemoryLedgerStore, InMemoryProviderConfigStore, InMemoryTokenStore,
    InMemoryTransactionStore,
};
use momo_gateway::interfaces::cli::{Cli, Command, status_request};
use momo_gateway::interfaces::csv::instruction_reader::{
    InstructionReader, Operation, PaymentInstruction,
};
use momo_gateway::interfaces::csv::result_writer::ResultWriter;
use serde::Serialize;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    transactions: TransactionStoreArc,
    tokens: TokenStoreArc,
    ledger: LedgerStoreArc,
}

fn in_memory_stores() -> Stores {
    Stores {
        transactions: Arc::new(InMemoryTransactionStore::new()),
        tokens: Arc::new(InMemoryTokenStore::new()),
        ledger: Arc::new(InMemoryLedgerStore::new()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use momo_gateway::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Stores {
                transactions: Arc::new(store.clone()),
                tokens: Arc::new(store.clone()),
                ledger: Arc::new(store),
            })
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", text);
    Ok(())
}

enum BatchRow {
    Rejected(String),
    Running(JoinHandle<(PaymentInstruction, momo_gateway::error::Result<PaymentResponse>)>),
}

async fn run_batch(orchestrator: Arc<PaymentOrchestrator>, input: PathBuf) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = InstructionReader::new(file);

    let mut rows = Vec::new();
    for (index, instruction) in reader.instructions().enumerate() {
        let line = index + 1;
        match instruction {
            Ok(instruction) => {
                let orchestrator = Arc::clone(&orchestrator);
                let handle = tokio::spawn(async move {
                    let request = instruction.to_request();
                    let response = match instruction.operation {
                        Operation::Deposit => orchestrator.deposit(&request).await,
                        Operation::Withdraw => orchestrator.withdraw(&request).await,
                    };
                    (instruction, response)
                });
                rows.push((line, BatchRow::Running(handle)));
            }
            Err(e) => {
                warn!(line, error = %e, "Error reading instruction");
                rows.push((line, BatchRow::Rejected(e.to_string())));
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = ResultWriter::new(stdout.lock());
    for (line, row) in rows {
        let written = match row {
            BatchRow::Rejected(message) => writer.write_rejected(line, &message),
            BatchRow::Running(handle) => match handle.await.into_diagnostic()? {
                (instruction, Ok(response)) => writer.write_result(line, &instruction, &response),
                (_, Err(e)) => {
                    error!(line, error = %e, "Error processing instruction");
                    writer.write_rejected(line, &e.to_string())
                }
            },
        };
        written.into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path).into_diagnostic()?,
        None => GatewayConfig::default(),
    };
    let stores = open_stores(cli.db_path)?;
    let clock: ClockArc = Arc::new(SystemClock);

    let tokens = TokenManager::new(stores.tokens, Arc::clone(&clock))
        .with_lifetime(config.token_lifetime(), config.token_safety_margin());
    let client = BtcClient::new(config.request_timeout()).into_diagnostic()?;
    let btc: PaymentAdapterArc = Arc::new(
        BtcAdapter::new(
            Arc::new(InMemoryProviderConfigStore::new(config.providers.clone())),
            Arc::new(tokens),
            Arc::clone(&stores.transactions),
            client,
            Arc::clone(&clock),
        )
        .with_currency(config.currency.as_str()),
    );
    let poster = LedgerPoster::new(stores.ledger, clock);
    let orchestrator = PaymentOrchestrator::new([btc], Arc::clone(&stores.transactions), poster)
        .with_posted_by(config.posted_by.as_str());

    match cli.command {
        Command::Deposit(args) => {
            let response = orchestrator.deposit(&args.to_request()).await.into_diagnostic()?;
            print_json(&response)
        }
        Command::Withdraw(args) => {
            let response = orchestrator.withdraw(&args.to_request()).await.into_diagnostic()?;
            print_json(&response)
        }
        Command::Status {
            provider,
            reference,
            original,
        } => {
            let request = status_request(&provider, &reference, original);
            let response = orchestrator.check_status(&request).await.into_diagnostic()?;
            print_json(&response)
        }
        Command::Transaction {
            reference,
            original,
        } => {
            let found = stores
                .transactions
                .find_by_reference(&reference, ReferenceKind::from_flag(original))
                .await
                .into_diagnostic()?;
            match found {
                Some(tx) => print_json(&tx),
                None => Err(PaymentError::TransactionNotFound(reference)).into_diagnostic(),
            }
        }
        Command::Batch { input } => run_batch(Arc::new(orchestrator), input).await,
    }
}
