//! Adapters behind the domain ports: storage backends, provider
//! integrations and clocks.

pub mod btc;
pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
