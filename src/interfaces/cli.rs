use crate::domain::money::Amount;
use crate::domain::payment::{PaymentRequest, StatusRequest};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mobile-money transaction gateway", long_about = None)]
pub struct Cli {
    /// Gateway configuration file (JSON)
    #[arg(long, env = "MOMO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "MOMO_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect money from a subscriber wallet
    Deposit(PaymentArgs),
    /// Pay money out to a subscriber wallet
    Withdraw(PaymentArgs),
    /// Ask the provider for the status of a transaction
    Status {
        #[arg(long)]
        provider: String,
        reference: String,
        /// The reference is the locally generated one
        #[arg(long)]
        original: bool,
    },
    /// Print a stored transaction
    Transaction {
        reference: String,
        #[arg(long)]
        original: bool,
    },
    /// Run a CSV file of payment instructions
    Batch {
        /// Instructions CSV: operation,provider,client,amount,msisdn
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct PaymentArgs {
    #[arg(long)]
    pub provider: String,
    #[arg(long)]
    pub client: String,
    #[arg(long, value_parser = parse_amount)]
    pub amount: Amount,
    /// Subscriber wallet number
    #[arg(long)]
    pub msisdn: String,
}

impl PaymentArgs {
    pub fn to_request(&self) -> PaymentRequest {
        PaymentRequest {
            provider: self.provider.clone(),
            client_id: self.client.clone(),
            amount: self.amount,
            subscriber_msisdn: self.msisdn.clone(),
        }
    }
}

pub fn status_request(provider: &str, reference: &str, original: bool) -> StatusRequest {
    StatusRequest {
        provider: provider.to_string(),
        transaction_reference: reference.to_string(),
        use_original_reference: original,
    }
}

fn parse_amount(raw: &str) -> Result<Amount, String> {
    let value: Decimal = raw.trim().parse().map_err(|e| format!("{}", e))?;
    Amount::new(value).map_err(|e| e.to_string())
}
