//! Domain model and the ports the orchestration core depends on.

pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
pub mod provider;
pub mod reference;
pub mod token;
pub mod transaction;
