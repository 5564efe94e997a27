//! Transaction manager
//!
//! Allocates transaction ids and tracks lifecycle metrics. Metric counters use
//! Relaxed ordering: they are observational only and synchronize nothing.

use crate::transaction::Transaction;
use nodex_core::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Snapshot of transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions currently active
    pub active: u64,
    /// Transactions ever started
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted
    pub aborted: u64,
}

/// Manages transaction lifecycle
pub struct TransactionManager {
    next_txn_id: AtomicU64,
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Create a manager whose first transaction gets id 1
    pub fn new() -> Self {
        TransactionManager {
            next_txn_id: AtomicU64::new(1),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Start a new transaction
    pub fn begin(&self) -> Transaction {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);

        debug!(target: "nodex::txn", txn_id, "Transaction started");

        Transaction::new(txn_id)
    }

    /// Commit an active transaction
    pub fn commit(&self, txn: &mut Transaction) -> Result<()> {
        txn.mark_committed()?;
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.total_committed.fetch_add(1, Ordering::Relaxed);
        debug!(target: "nodex::txn", txn_id = txn.id(), "Transaction committed");
        Ok(())
    }

    /// Abort an active transaction
    pub fn abort(&self, txn: &mut Transaction, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        txn.mark_aborted(reason.clone())?;
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
        warn!(target: "nodex::txn", txn_id = txn.id(), reason = %reason, "Transaction aborted");
        Ok(())
    }

    /// Current counter values
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active: self.active_count.load(Ordering::Relaxed),
            started: self.total_started.load(Ordering::Relaxed),
            committed: self.total_committed.load(Ordering::Relaxed),
            aborted: self.total_aborted.load(Ordering::Relaxed),
        }
    }
}
