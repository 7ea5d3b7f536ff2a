//! Ledger node
//!
//! The node owns the ledger, the peer registry and the consensus resolver, and
//! exposes the operations the transport layer calls into.

use crate::core::{Block, Blockchain, ChainError, ChainSnapshot, Transaction};
use crate::error::ValidationError;
use crate::mining::{Miner, MiningError, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::network::client::{ChainSource, HttpChainSource, DEFAULT_PEER_TIMEOUT};
use crate::network::consensus::{ConsensusResolver, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::network::peer::PeerRegistry;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Shortest period accepted by the periodic consensus loop
pub const MIN_RESOLVE_INTERVAL: Duration = Duration::from_millis(100);

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP server binds to
    pub host: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Leading zero hex digits required of every proof
    pub difficulty: usize,
    /// Identity that receives mining rewards; random when not set
    pub node_id: Option<String>,
    /// Peers registered at startup
    pub bootstrap_peers: Vec<String>,
    /// Limit for fetching one peer's chain
    pub peer_timeout: Duration,
    /// Peers queried at the same time during resolution
    pub max_concurrent_fetches: usize,
    /// Run conflict resolution on this interval, if set
    pub resolve_interval: Option<Duration>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            difficulty: DEFAULT_DIFFICULTY,
            node_id: None,
            bootstrap_peers: Vec::new(),
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            resolve_interval: None,
        }
    }
}

impl NodeConfig {
    /// Reject settings the node cannot run with
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ValidationError::invalid(
                "difficulty",
                format!("must be at most {}", MAX_DIFFICULTY),
            ));
        }
        if self.resolve_interval == Some(Duration::ZERO) {
            return Err(ValidationError::invalid(
                "resolve_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Outcome of a resolution request
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/// Generate a random node identifier (32 hex characters)
pub fn generate_node_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// The ledger node
pub struct Node {
    pub config: NodeConfig,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub peers: Arc<PeerRegistry>,
    node_id: String,
    miner: Miner,
    resolver: ConsensusResolver,
    shutdown: Arc<AtomicBool>,
}

impl Node {
    /// Create a node that fetches peer chains over HTTP
    pub async fn new(config: NodeConfig) -> Result<Self, ValidationError> {
        let source = Arc::new(HttpChainSource::new(config.peer_timeout));
        Self::with_chain_source(config, source).await
    }

    /// Create a node with a custom way of fetching peer chains
    pub async fn with_chain_source(
        config: NodeConfig,
        source: Arc<dyn ChainSource>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;

        let node_id = config.node_id.clone().unwrap_or_else(generate_node_id);
        let blockchain = Arc::new(RwLock::new(Blockchain::with_difficulty(config.difficulty)));
        let peers = Arc::new(PeerRegistry::new());

        if !config.bootstrap_peers.is_empty() {
            peers.register_all(&config.bootstrap_peers).await?;
        }

        let resolver = ConsensusResolver::new(blockchain.clone(), peers.clone(), source)
            .with_max_concurrent_fetches(config.max_concurrent_fetches);

        log::info!(
            "Node {} ready (difficulty {}, {} bootstrap peer(s))",
            node_id,
            config.difficulty,
            config.bootstrap_peers.len()
        );

        Ok(Self {
            config,
            blockchain,
            peers,
            miner: Miner::new(&node_id),
            node_id,
            resolver,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Identity that receives this node's mining rewards
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Pool a transaction; returns the index of the block it is eligible for
    pub async fn submit_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, ValidationError> {
        let tx = Transaction::new(sender, recipient, amount)?;
        Ok(self.submit(tx).await)
    }

    /// Pool a transaction described by an untyped JSON body
    pub async fn submit_json(&self, body: &serde_json::Value) -> Result<u64, ValidationError> {
        let tx = Transaction::from_json(body)?;
        Ok(self.submit(tx).await)
    }

    async fn submit(&self, tx: Transaction) -> u64 {
        let index = self.blockchain.write().await.submit_transaction(tx);
        log::debug!("Transaction pooled for block {}", index);
        index
    }

    /// Mine a block holding every pending transaction plus this node's reward
    pub async fn mine(&self) -> Result<Block, MiningError> {
        if self.is_shutting_down() {
            return Err(MiningError::Cancelled);
        }

        let (block, _) = self
            .miner
            .mine_shared(&self.blockchain, self.shutdown.clone())
            .await?;
        Ok(block)
    }

    /// Copy of the current chain
    pub async fn get_chain(&self) -> ChainSnapshot {
        self.blockchain.read().await.snapshot()
    }

    /// Transactions waiting for the next block
    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.blockchain.read().await.pending_transactions().to_vec()
    }

    /// Validate the local chain
    pub async fn validate(&self) -> (usize, Result<(), ChainError>) {
        let chain = self.blockchain.read().await;
        (chain.len(), chain.validate())
    }

    /// Register peers; returns every known peer
    pub async fn register_peers(&self, addresses: &[String]) -> Result<Vec<String>, ValidationError> {
        self.peers.register_all(addresses).await
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.peers().await
    }

    /// Adopt the longest valid chain among peers, if it beats ours
    pub async fn resolve(&self) -> Resolution {
        let replaced = self.resolver.resolve_conflicts().await;
        let chain = self.blockchain.read().await.blocks().to_vec();
        Resolution { replaced, chain }
    }

    /// Resolve conflicts on a fixed interval until shutdown.
    ///
    /// Intervals shorter than [`MIN_RESOLVE_INTERVAL`] are raised to it.
    pub fn spawn_consensus_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let interval = interval.max(MIN_RESOLVE_INTERVAL);
        let node = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if node.is_shutting_down() {
                    break;
                }
                if node.resolver.resolve_conflicts().await {
                    log::info!("Periodic resolution adopted a longer chain");
                }
            }
            log::info!("Consensus loop stopped");
        })
    }

    /// Ask in-flight mining and background tasks to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
