//! Hashlink: a minimal proof-of-work ledger node in Rust
//!
//! This crate provides:
//! - Hash-linked blocks over a canonical JSON form
//! - Proof of work over pairs of consecutive proofs
//! - A pending transaction pool drained atomically into each forged block
//! - Chain validation (linkage and proof checks)
//! - Longest-valid-chain conflict resolution across registered peers
//! - A small HTTP API exposing all of the above
//!
//! # Example
//!
//! ```rust
//! use hashlink::core::{Blockchain, Transaction};
//! use hashlink::mining::Miner;
//!
//! // Create a new ledger with an easy puzzle
//! let mut blockchain = Blockchain::with_difficulty(2);
//!
//! // Pool a transaction
//! let tx = Transaction::new("alice", "bob", 5).unwrap();
//! assert_eq!(blockchain.submit_transaction(tx), 2);
//!
//! // Mine a block
//! let miner = Miner::new("my-node");
//! let (block, stats) = miner.mine_block(&mut blockchain);
//! println!("Mined block {} in {}ms", block.index, stats.time_ms);
//!
//! assert_eq!(block.transactions.len(), 2);
//! assert!(blockchain.is_valid());
//! ```

pub mod api;
pub mod core;
pub mod crypto;
pub mod error;
pub mod mining;
pub mod network;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{
    Block, Blockchain, ChainError, ChainSnapshot, Transaction, BLOCK_REWARD, REWARD_SENDER,
};
pub use error::ValidationError;
pub use mining::{find_proof, valid_proof, Mempool, Miner, MiningError, DEFAULT_DIFFICULTY};
pub use network::{ConsensusResolver, Node, NodeConfig, PeerError, PeerRegistry, Resolution};
