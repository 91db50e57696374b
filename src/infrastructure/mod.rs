//! Ambient stack: configuration, logging, locking, transactions, and the
//! physical-backend adapters that implement `domain::ports::ObjectStore`.

pub mod backend;
pub mod config;
pub mod locking;
pub mod logging;
pub mod transaction;

pub use config::{AppConfig, ConfigLoader};
pub use locking::PathLockManager;
pub use transaction::{TransactionManager, TransactionRecord, TransactionStatus};
