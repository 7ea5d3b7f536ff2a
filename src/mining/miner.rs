//! Mining engine for the ledger
//!
//! Finds the next proof, pools the reward transaction and forges the block.

use crate::core::{Block, Blockchain, Transaction};
use crate::mining::pow::{find_proof, find_proof_cancellable};
use log::{info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Mining was cancelled")]
    Cancelled,
    #[error("Mining worker failed: {0}")]
    Worker(String),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of proof candidates tried
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
    /// Searches restarted because the tip moved underneath them
    pub restarts: u32,
}

impl MiningStats {
    fn new(start: Instant, hash_attempts: u64, restarts: u32) -> Self {
        let time_ms = start.elapsed().as_millis();
        let hash_rate = if time_ms > 0 {
            (hash_attempts as f64) / (time_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };

        Self {
            hash_attempts,
            time_ms,
            hash_rate,
            restarts,
        }
    }
}

/// Miner for creating new blocks
pub struct Miner {
    /// Identity that receives the block reward
    pub address: String,
}

impl Miner {
    /// Create a new miner
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }

    /// Pool the reward and append a block holding everything pooled
    pub fn forge(&self, blockchain: &mut Blockchain, proof: u64, previous_hash: String) -> Block {
        blockchain.submit_transaction(Transaction::reward(&self.address));
        blockchain.append_block(proof, Some(previous_hash))
    }

    /// Mine a block on a ledger the caller owns exclusively
    pub fn mine_block(&self, blockchain: &mut Blockchain) -> (Block, MiningStats) {
        let start = Instant::now();
        let tip = blockchain.tip();
        let (last_proof, previous_hash) = (tip.proof, tip.hash());

        info!(
            "Mining block {} with difficulty {}...",
            tip.index + 1,
            blockchain.difficulty()
        );

        let proof = find_proof(last_proof, blockchain.difficulty());
        let block = self.forge(blockchain, proof, previous_hash);
        let stats = MiningStats::new(start, proof + 1, 0);

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            block.index, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        (block, stats)
    }

    /// Mine a block on a shared ledger without holding its lock during the search.
    ///
    /// The search runs on the blocking thread pool. If the tip changes while it
    /// runs (another block was forged, or the chain was replaced), the found
    /// proof no longer links and the search starts over from the new tip.
    pub async fn mine_shared(
        &self,
        blockchain: &RwLock<Blockchain>,
        cancel: Arc<AtomicBool>,
    ) -> Result<(Block, MiningStats), MiningError> {
        let start = Instant::now();
        let mut hash_attempts = 0u64;
        let mut restarts = 0u32;

        loop {
            let (next_index, last_proof, previous_hash, difficulty) = {
                let chain = blockchain.read().await;
                let tip = chain.tip();
                (tip.index + 1, tip.proof, tip.hash(), chain.difficulty())
            };

            info!(
                "Mining block {} with difficulty {}...",
                next_index, difficulty
            );

            let flag = cancel.clone();
            let proof = tokio::task::spawn_blocking(move || {
                find_proof_cancellable(last_proof, difficulty, &flag)
            })
            .await
            .map_err(|e| MiningError::Worker(e.to_string()))?
            .ok_or(MiningError::Cancelled)?;
            hash_attempts += proof + 1;

            let mut chain = blockchain.write().await;
            if chain.tip().hash() != previous_hash {
                warn!(
                    "Tip moved while mining block {}, restarting search",
                    next_index
                );
                restarts += 1;
                continue;
            }

            let block = self.forge(&mut chain, proof, previous_hash);
            drop(chain);

            let stats = MiningStats::new(start, hash_attempts, restarts);
            info!(
                "Block {} mined in {}ms ({} attempts, {} restart(s), {:.2} H/s)",
                block.index, stats.time_ms, stats.hash_attempts, stats.restarts, stats.hash_rate
            );

            return Ok((block, stats));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BLOCK_REWARD, REWARD_SENDER};
    use crate::mining::pow::valid_proof;

    const DIFFICULTY: usize = 2;

    #[test]
    fn test_miner() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        let miner = Miner::new("miner_address");

        let (block, stats) = miner.mine_block(&mut blockchain);

        assert_eq!(block.index, 2);
        assert!(valid_proof(blockchain.blocks()[0].proof, block.proof, DIFFICULTY));
        assert!(stats.hash_attempts > 0);
        assert!(blockchain.is_valid());
    }

    #[test]
    fn test_reward_follows_pending_transactions() {
        let mut blockchain = Blockchain::with_difficulty(DIFFICULTY);
        let pending = Transaction::new("alice", "bob", 4).unwrap();
        blockchain.submit_transaction(pending.clone());

        let (block, _) = Miner::new("me").mine_block(&mut blockchain);

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0], pending);
        let rewards: Vec<&Transaction> =
            block.transactions.iter().filter(|tx| tx.is_reward()).collect();
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].sender, REWARD_SENDER);
        assert_eq!(rewards[0].recipient, "me");
        assert_eq!(rewards[0].amount, BLOCK_REWARD);
    }

    #[tokio::test]
    async fn test_mine_shared() {
        let blockchain = RwLock::new(Blockchain::with_difficulty(DIFFICULTY));
        let miner = Miner::new("miner_address");

        for expected in 2..=4 {
            let (block, stats) = miner
                .mine_shared(&blockchain, Arc::new(AtomicBool::new(false)))
                .await
                .unwrap();
            assert_eq!(block.index, expected);
            // Nobody else touches the chain, so the first search always lands
            assert_eq!(stats.restarts, 0);
        }

        let chain = blockchain.read().await;
        assert_eq!(chain.len(), 4);
        assert!(chain.is_valid());
    }

    #[tokio::test]
    async fn test_mine_shared_cancelled() {
        let blockchain = RwLock::new(Blockchain::with_difficulty(64));
        let miner = Miner::new("miner_address");

        let result = miner
            .mine_shared(&blockchain, Arc::new(AtomicBool::new(true)))
            .await;

        assert!(matches!(result, Err(MiningError::Cancelled)));
        assert_eq!(blockchain.read().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_miners_keep_chain_valid() {
        let blockchain = Arc::new(RwLock::new(Blockchain::with_difficulty(DIFFICULTY)));

        let mut handles = Vec::new();
        for id in 0..4 {
            let blockchain = blockchain.clone();
            handles.push(tokio::spawn(async move {
                Miner::new(&format!("miner-{}", id))
                    .mine_shared(&blockchain, Arc::new(AtomicBool::new(false)))
                    .await
                    .map(|(block, _)| block.index)
            }));
        }

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap().unwrap());
        }
        indices.sort();

        assert_eq!(indices, vec![2, 3, 4, 5]);
        let chain = blockchain.read().await;
        assert!(chain.is_valid());
        for block in &chain.blocks()[1..] {
            assert_eq!(block.transactions.iter().filter(|t| t.is_reward()).count(), 1);
        }
    }
}
