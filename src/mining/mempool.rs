//! Transaction pool (mempool) for pending transactions
//!
//! Holds submitted transactions in arrival order until the next block is
//! forged, at which point the whole pool is drained into that block.

use crate::core::Transaction;

/// Memory pool of transactions awaiting inclusion
#[derive(Debug, Default, Clone)]
pub struct Mempool {
    /// Pending transactions in order of arrival
    transactions: Vec<Transaction>,
}

impl Mempool {
    /// Create an empty mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction to the back of the pool
    pub fn add(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Remove and return every pending transaction, leaving the pool empty
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    /// Pending transactions in arrival order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
