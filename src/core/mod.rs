//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (sender, recipient, amount)
//! - Blocks (hash-linked, carrying a proof of work)
//! - Blockchain (chain store that also owns the pending pool)
//! - Chain validation (linkage and proof checks)

pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod validation;

pub use block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use blockchain::{Blockchain, BlockchainError, ChainSnapshot};
pub use transaction::{Transaction, BLOCK_REWARD, REWARD_SENDER};
pub use validation::{is_valid_chain, validate_chain, ChainError};
