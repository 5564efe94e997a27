//! Concurrency layer for nodex
//!
//! This crate provides:
//! - Transaction / TransactionManager: write transactions that bracket a
//!   document mutation and its index flush
//! - DocumentLockManager: shared/exclusive per-document locks held by readers
//!   and by the writer for the full mutation-plus-flush window

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod manager;
pub mod transaction;

pub use lock::{DocumentLockManager, DocumentReadGuard, DocumentWriteGuard};
pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{Transaction, TransactionStatus};
