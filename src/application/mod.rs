//! Application layer containing the orchestration logic.
//!
//! `PaymentOrchestrator` is the entry point for deposits, withdrawals and
//! status checks. It delegates provider work to a `PaymentAdapter`, which in
//! turn draws bearer tokens from the `TokenManager`; confirmed transactions
//! are handed to the `LedgerPoster`.

pub mod ledger_poster;
pub mod orchestrator;
pub mod token_manager;
