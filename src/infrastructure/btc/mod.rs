//! Reference provider integration: the BTC mobile-money network.

pub mod adapter;
pub mod client;

pub use adapter::BtcAdapter;
pub use client::BtcClient;
