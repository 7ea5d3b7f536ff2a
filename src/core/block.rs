//! Block implementation for the ledger
//!
//! A block seals an ordered list of transactions together with the proof that
//! extended the chain and the hash of the block before it.

use crate::core::transaction::Transaction;
use crate::crypto::{canonical_json, sha256_hex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Proof carried by the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 1 for genesis
    pub index: u64,
    /// When the block was forged
    pub timestamp: DateTime<Utc>,
    /// Transactions sealed into this block, in pool order
    pub transactions: Vec<Transaction>,
    /// Proof of work linking this block to its predecessor's proof
    pub proof: u64,
    /// Hash of the preceding block
    pub previous_hash: String,
}

impl Block {
    /// Create a new block stamped with the current time
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp: Utc::now(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Create the genesis block
    pub fn genesis() -> Self {
        Self::new(
            1,
            Vec::new(),
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// SHA-256 over the canonical (key-sorted) JSON form of the block
    pub fn hash(&self) -> String {
        let value = json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        });
        sha256_hex(canonical_json(&value).as_bytes())
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}
