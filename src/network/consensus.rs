//! Conflict resolution between nodes
//!
//! The longest valid chain wins. Every registered peer is asked for its chain;
//! a peer's chain is only considered if it is strictly longer than the best one
//! seen so far (starting from our own length) and passes validation. Peers that
//! cannot be reached or answer with garbage are skipped.

use crate::core::{validate_chain, Block, Blockchain, ChainSnapshot};
use crate::network::client::ChainSource;
use crate::network::peer::{PeerError, PeerRegistry};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of peers queried at the same time
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Replaces the local chain with the longest valid chain among peers
pub struct ConsensusResolver {
    blockchain: Arc<RwLock<Blockchain>>,
    peers: Arc<PeerRegistry>,
    source: Arc<dyn ChainSource>,
    max_concurrent_fetches: usize,
}

impl ConsensusResolver {
    pub fn new(
        blockchain: Arc<RwLock<Blockchain>>,
        peers: Arc<PeerRegistry>,
        source: Arc<dyn ChainSource>,
    ) -> Self {
        Self {
            blockchain,
            peers,
            source,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Run one resolution pass. Returns whether the local chain was replaced.
    pub async fn resolve_conflicts(&self) -> bool {
        let peers = self.peers.peers().await;
        if peers.is_empty() {
            debug!("No peers registered, nothing to resolve");
            return false;
        }

        let (mut max_length, difficulty) = {
            let chain = self.blockchain.read().await;
            (chain.len(), chain.difficulty())
        };

        // Network I/O happens without holding the ledger lock
        let responses: Vec<(String, Result<ChainSnapshot, PeerError>)> = stream::iter(peers)
            .map(|peer| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.fetch_chain(&peer).await;
                    (peer, result)
                }
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut best: Option<(String, Vec<Block>)> = None;
        for (peer, result) in responses {
            let snapshot = match result.and_then(|s| check_length(&peer, s)) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Skipping peer: {}", e);
                    continue;
                }
            };

            if snapshot.length <= max_length {
                debug!(
                    "Peer {} chain length {} does not beat {}",
                    peer, snapshot.length, max_length
                );
                continue;
            }

            // Re-hashing a long chain is CPU-bound
            let length = snapshot.length;
            let verdict = tokio::task::spawn_blocking(move || {
                let result = validate_chain(&snapshot.chain, difficulty);
                (snapshot.chain, result)
            })
            .await;

            let chain = match verdict {
                Ok((chain, Ok(()))) => chain,
                Ok((_, Err(source))) => {
                    warn!("Skipping peer: {}", PeerError::InvalidChain { peer, source });
                    continue;
                }
                Err(e) => {
                    warn!("Validation of chain from {} failed to run: {}", peer, e);
                    continue;
                }
            };

            max_length = length;
            best = Some((peer, chain));
        }

        let Some((peer, chain)) = best else {
            info!("Our chain is authoritative");
            return false;
        };

        let mut local = self.blockchain.write().await;
        // The local chain may have grown while peers were being queried
        if chain.len() <= local.len() {
            info!(
                "Chain from {} (length {}) no longer beats local length {}",
                peer,
                chain.len(),
                local.len()
            );
            return false;
        }

        let length = chain.len();
        match local.replace(chain) {
            Ok(()) => {
                info!("Our chain was replaced by {}'s chain of length {}", peer, length);
                true
            }
            Err(e) => {
                warn!("Could not adopt chain from {}: {}", peer, e);
                false
            }
        }
    }
}

/// Reject snapshots whose reported length disagrees with their contents
fn check_length(peer: &str, snapshot: ChainSnapshot) -> Result<ChainSnapshot, PeerError> {
    if snapshot.length != snapshot.chain.len() {
        return Err(PeerError::Malformed {
            peer: peer.to_string(),
            reason: format!(
                "reported length {} but sent {} blocks",
                snapshot.length,
                snapshot.chain.len()
            ),
        });
    }
    Ok(snapshot)
}
