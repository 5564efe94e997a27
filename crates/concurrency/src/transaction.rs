//! Write transactions
//!
//! A `Transaction` brackets one or more document mutations. Index workers
//! receive the transaction with every stream event and flush their buffers
//! while it is still active; if it aborts, buffered index state is discarded
//! and nothing reaches the engines.
//!
//! State transitions:
//! - `Active` → `Committed`
//! - `Active` → `Aborted`
//!
//! Terminal states (no transitions allowed):
//! - `Committed`
//! - `Aborted`

use nodex_core::{Error, Result};
use std::time::{Duration, Instant};

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// A write transaction
#[derive(Debug)]
pub struct Transaction {
    txn_id: u64,
    status: TransactionStatus,
    start_time: Instant,
}

impl Transaction {
    /// Create an active transaction
    pub fn new(txn_id: u64) -> Self {
        Transaction {
            txn_id,
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    /// Transaction id
    pub fn id(&self) -> u64 {
        self.txn_id
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction is aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Get the elapsed time since transaction started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if transaction can accept operations
    ///
    /// # Errors
    /// Returns `Error::TransactionAborted` if aborted, `Error::InvalidOperation`
    /// if already committed.
    pub fn ensure_active(&self) -> Result<()> {
        match &self.status {
            TransactionStatus::Active => Ok(()),
            TransactionStatus::Aborted { .. } => Err(Error::TransactionAborted(self.txn_id)),
            TransactionStatus::Committed => Err(Error::invalid_operation(format!(
                "Transaction {} is already committed",
                self.txn_id
            ))),
        }
    }

    /// Transition to Committed state
    pub(crate) fn mark_committed(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Transition to Aborted state
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if already `Committed` or `Aborted`.
    pub(crate) fn mark_aborted(&mut self, reason: String) -> Result<()> {
        match &self.status {
            TransactionStatus::Committed => Err(Error::invalid_operation(format!(
                "Cannot abort committed transaction {}",
                self.txn_id
            ))),
            TransactionStatus::Aborted { .. } => Err(Error::invalid_operation(format!(
                "Transaction {} already aborted",
                self.txn_id
            ))),
            TransactionStatus::Active => {
                self.status = TransactionStatus::Aborted { reason };
                Ok(())
            }
        }
    }
}
