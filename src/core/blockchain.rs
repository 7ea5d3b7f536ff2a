//! Blockchain implementation
//!
//! The ledger owns both the chain of blocks and the pool of pending
//! transactions. Forging a block drains the pool and appends the block in one
//! call, so whoever holds the ledger exclusively sees the two change together.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::core::validation::{validate_chain, ChainError};
use crate::mining::mempool::Mempool;
use crate::mining::pow::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Blockchain-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("Cannot replace the chain with an empty one")]
    EmptyChain,
}

/// A copy of the chain together with its length, as served to peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

/// The ledger: chain of blocks plus pending transactions
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, never empty
    blocks: Vec<Block>,
    /// Transactions waiting for the next block
    mempool: Mempool,
    /// Leading zero hex digits required of every proof
    difficulty: usize,
}

impl Blockchain {
    /// Create a new ledger holding only the genesis block
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// Create a ledger with a custom proof-of-work difficulty.
    ///
    /// Difficulties above [`MAX_DIFFICULTY`] are unsolvable and are capped.
    pub fn with_difficulty(difficulty: usize) -> Self {
        if difficulty > MAX_DIFFICULTY {
            log::warn!(
                "Difficulty {} exceeds digest length, capping at {}",
                difficulty,
                MAX_DIFFICULTY
            );
        }

        Self {
            blocks: vec![Block::genesis()],
            mempool: Mempool::new(),
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    /// Get the most recently appended block
    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("Blockchain should have at least genesis block")
    }

    /// All blocks from genesis to tip
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get a block by its index (genesis is 1)
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        let position = usize::try_from(index.checked_sub(1)?).ok()?;
        self.blocks.get(position)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a ledger holds at least its genesis block
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Transactions waiting for the next block
    pub fn pending_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    /// Pool a transaction and return the index of the block it is eligible for
    pub fn submit_transaction(&mut self, tx: Transaction) -> u64 {
        self.mempool.add(tx);
        self.tip().index + 1
    }

    /// Forge a block from everything in the pool and append it.
    ///
    /// `previous_hash` defaults to the hash of the current tip.
    pub fn append_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| self.tip().hash());
        let block = Block::new(
            self.tip().index + 1,
            self.mempool.drain(),
            proof,
            previous_hash,
        );

        log::info!(
            "Forged block {} with {} transaction(s), proof {}",
            block.index,
            block.tx_count(),
            block.proof
        );

        self.blocks.push(block.clone());
        block
    }

    /// Substitute the held chain.
    ///
    /// No validation happens here; callers validate the candidate first.
    pub fn replace(&mut self, chain: Vec<Block>) -> Result<(), BlockchainError> {
        if chain.is_empty() {
            return Err(BlockchainError::EmptyChain);
        }

        log::info!(
            "Replacing chain of length {} with chain of length {}",
            self.blocks.len(),
            chain.len()
        );
        self.blocks = chain;
        Ok(())
    }

    /// Validate the held chain
    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks, self.difficulty)
    }

    /// Whether the held chain passes validation
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Copy of the chain and its length
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.blocks.clone())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
    use crate::mining::pow::find_proof;

    const DIFFICULTY: usize = 2;

    fn mine(blockchain: &mut Blockchain) -> Block {
        let proof = find_proof(blockchain.tip().proof, blockchain.difficulty());
        blockchain.append_block(proof, None)
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::with_difficulty(DIFFICULTY);
        assert_eq!(blockchain.len(), 1);

        let genesis = blockchain.tip();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert!(blockchain.pending_transactions().is_empty());
        assert!(blockchain.is_valid());
    }

    #[test]
    fn test_difficulty_capped_at_digest_length() {
        assert_eq!(Blockchain::with_difficulty(MAX_DIFFICULTY).difficulty(), MAX_DIFFICULTY);
        assert_eq!(Blockchain::with_difficulty(65).difficulty(), MAX_DIFFICULTY);
        assert_eq!(Blockchain::with_difficulty(usize::MAX).difficulty(), MAX_DIFFICULTY);
    }

    #[test]
    fn test_submit_returns_next_index() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        let tx = Transaction::new("alice", "bob", 5).unwrap();
        assert_eq!(blockchain.submit_transaction(tx.clone()), 2);
        assert_eq!(blockchain.submit_transaction(tx), 2);
        assert_eq!(blockchain.pending_transactions().len(), 2);

        mine(&mut blockchain);
        let tx = Transaction::new("carol", "dave", 1).unwrap();
        assert_eq!(blockchain.submit_transaction(tx), 3);
    }

    #[test]
    fn test_append_block_drains_pool() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        let pooled = vec![
            Transaction::new("alice", "bob", 5).unwrap(),
            Transaction::new("bob", "carol", 2).unwrap(),
        ];
        for tx in &pooled {
            blockchain.submit_transaction(tx.clone());
        }

        let block = mine(&mut blockchain);

        assert_eq!(block.index, 2);
        assert_eq!(block.transactions, pooled);
        assert_eq!(block.previous_hash, blockchain.blocks()[0].hash());
        assert!(blockchain.pending_transactions().is_empty());
        assert_eq!(blockchain.tip(), &block);
    }

    #[test]
    fn test_append_block_with_explicit_previous_hash() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        let block = blockchain.append_block(7, Some("explicit".to_string()));
        assert_eq!(block.previous_hash, "explicit");
        assert!(!blockchain.is_valid());
    }

    #[test]
    fn test_repeated_appends_stay_valid() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        for i in 0..5 {
            blockchain.submit_transaction(Transaction::new("a", "b", i).unwrap());
            mine(&mut blockchain);
            assert!(blockchain.is_valid());
        }
        assert_eq!(blockchain.len(), 6);
        assert_eq!(blockchain.tip().index, 6);
    }

    #[test]
    fn test_get_block() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        mine(&mut blockchain);
        assert_eq!(blockchain.get_block(1).map(|b| b.index), Some(1));
        assert_eq!(blockchain.get_block(2).map(|b| b.index), Some(2));
        assert!(blockchain.get_block(0).is_none());
        assert!(blockchain.get_block(3).is_none());
    }

    #[test]
    fn test_replace() {
        let mut ours = Blockchain::with_difficulty(DIFFICULTY);
        let mut theirs = Blockchain::with_difficulty(DIFFICULTY);
        mine(&mut theirs);
        mine(&mut theirs);

        ours.submit_transaction(Transaction::new("alice", "bob", 1).unwrap());
        ours.replace(theirs.blocks().to_vec()).unwrap();

        assert_eq!(ours.blocks(), theirs.blocks());
        assert_eq!(ours.pending_transactions().len(), 1);
        assert_eq!(ours.replace(Vec::new()), Err(BlockchainError::EmptyChain));
        assert_eq!(ours.len(), 3);
    }

    #[test]
    fn test_snapshot() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        mine(&mut blockchain);
        let snapshot = blockchain.snapshot();
        assert_eq!(snapshot.length, 2);
        assert_eq!(snapshot.chain, blockchain.blocks());
    }
}
