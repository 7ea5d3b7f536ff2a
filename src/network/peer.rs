//! Peer registry
//!
//! Tracks the other nodes whose chains are consulted during conflict
//! resolution. Peers are identified by their canonical `host:port`.

use crate::core::ChainError;
use crate::error::ValidationError;
use std::collections::BTreeSet;
use thiserror::Error;
use tokio::sync::RwLock;

/// Port assumed when a peer address does not carry one
pub const DEFAULT_PEER_PORT: u16 = 80;

/// Failures talking to a single peer. These never abort a resolution pass;
/// the offending peer is skipped.
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },
    #[error("Peer {peer} timed out")]
    Timeout { peer: String },
    #[error("Peer {peer} answered with status {status}")]
    BadStatus { peer: String, status: u16 },
    #[error("Peer {peer} sent a malformed response: {reason}")]
    Malformed { peer: String, reason: String },
    #[error("Peer {peer} sent an invalid chain: {source}")]
    InvalidChain {
        peer: String,
        #[source]
        source: ChainError,
    },
}

/// Parse a node locator into its canonical `host:port` identity.
///
/// Accepts `http://host:port/path` or a bare `host:port`. Peers are always
/// spoken to over plain HTTP, so any other scheme is refused.
pub fn parse_peer_address(address: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidPeerAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = address.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => rest,
        Some(_) => return Err(invalid("only plain http peers are supported")),
        None => trimmed,
    };

    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    // Credentials are never part of the identity
    let authority = authority.rsplit('@').next().unwrap_or_default();

    if authority.is_empty() {
        return Err(invalid("missing host"));
    }

    let (host, port) = match authority.rsplit_once(':') {
        // Bracketed IPv6 without a port, e.g. [::1]
        Some(_) if authority.ends_with(']') => (authority, DEFAULT_PEER_PORT),
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            (host, port)
        }
        None => (authority, DEFAULT_PEER_PORT),
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(invalid("host contains whitespace"));
    }

    Ok(format!("{}:{}", host.to_ascii_lowercase(), port))
}

/// Set of known peers
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns whether it was not already known.
    pub async fn register(&self, address: &str) -> Result<bool, ValidationError> {
        let peer = parse_peer_address(address)?;
        let added = self.peers.write().await.insert(peer.clone());
        if added {
            log::info!("Registered peer {}", peer);
        }
        Ok(added)
    }

    /// Validate a whole list, then register every entry.
    ///
    /// Nothing is registered if any entry is invalid. Returns all known peers.
    pub async fn register_all(&self, addresses: &[String]) -> Result<Vec<String>, ValidationError> {
        if addresses.is_empty() {
            return Err(ValidationError::EmptyPeerList);
        }

        let parsed = addresses
            .iter()
            .map(|a| parse_peer_address(a))
            .collect::<Result<Vec<_>, _>>()?;

        let mut peers = self.peers.write().await;
        for peer in parsed {
            if peers.insert(peer.clone()) {
                log::info!("Registered peer {}", peer);
            }
        }
        Ok(peers.iter().cloned().collect())
    }

    /// All known peers, sorted
    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.iter().cloned().collect()
    }

    pub async fn contains(&self, address: &str) -> bool {
        match parse_peer_address(address) {
            Ok(peer) => self.peers.read().await.contains(&peer),
            Err(_) => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_address() {
        assert_eq!(
            parse_peer_address("http://192.168.0.5:5000").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            parse_peer_address("http://192.168.0.5:5000/chain?x=1").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(parse_peer_address("localhost:5001").unwrap(), "localhost:5001");
        assert_eq!(parse_peer_address("HTTP://Node.Example").unwrap(), "node.example:80");
        assert_eq!(parse_peer_address("http://user@host:9000").unwrap(), "host:9000");
        assert_eq!(parse_peer_address("[::1]:7000").unwrap(), "[::1]:7000");
        assert_eq!(parse_peer_address("[::1]").unwrap(), "[::1]:80");
    }

    #[test]
    fn test_parse_peer_address_rejects_garbage() {
        for bad in [
            "",
            "   ",
            "http://",
            "host:notaport",
            "host:70000",
            "ftp://host:1",
            ":5000",
            "https://host",
            "https://host:443",
        ] {
            assert!(
                matches!(
                    parse_peer_address(bad),
                    Err(ValidationError::InvalidPeerAddress { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = PeerRegistry::new();
        assert!(registry.register("http://127.0.0.1:5001").await.unwrap());
        assert!(!registry.register("127.0.0.1:5001").await.unwrap());
        assert!(!registry.register("http://127.0.0.1:5001/").await.unwrap());
        assert_eq!(registry.len().await, 1);
        assert!(registry.contains("http://127.0.0.1:5001").await);
    }

    #[tokio::test]
    async fn test_register_all() {
        let registry = PeerRegistry::new();
        let peers = registry
            .register_all(&[
                "http://127.0.0.1:5002".to_string(),
                "127.0.0.1:5001".to_string(),
                "127.0.0.1:5002".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(peers, vec!["127.0.0.1:5001", "127.0.0.1:5002"]);
    }

    #[tokio::test]
    async fn test_register_all_rejects_empty_or_invalid() {
        let registry = PeerRegistry::new();
        assert_eq!(
            registry.register_all(&[]).await,
            Err(ValidationError::EmptyPeerList)
        );

        let result = registry
            .register_all(&["127.0.0.1:5001".to_string(), "bad:port".to_string()])
            .await;
        assert!(matches!(result, Err(ValidationError::InvalidPeerAddress { .. })));
        assert!(registry.is_empty().await);
    }
}
