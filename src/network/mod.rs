//! Networking module
//!
//! Provides everything a node needs to agree on a chain with its peers.
//!
//! # Features
//! - Peer registry with canonical `host:port` identities
//! - Chain fetching over HTTP with timeouts
//! - Longest-valid-chain conflict resolution with bounded parallelism
//! - The node aggregate tying ledger, peers and resolver together

pub mod client;
pub mod consensus;
pub mod node;
pub mod peer;

pub use client::{ChainSource, HttpChainSource, DEFAULT_PEER_TIMEOUT, MAX_RESPONSE_BYTES};
pub use consensus::{ConsensusResolver, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use node::{generate_node_id, Node, NodeConfig, Resolution, MIN_RESOLVE_INTERVAL};
pub use peer::{parse_peer_address, PeerError, PeerRegistry, DEFAULT_PEER_PORT};
