//! Fetching chains from peers
//!
//! [`ChainSource`] is the seam between conflict resolution and the network.
//! [`HttpChainSource`] asks a peer's `GET /chain` endpoint over a plain TCP
//! connection, the same minimal HTTP/1.1 exchange used for any other one-shot
//! request this node makes.

use crate::core::ChainSnapshot;
use crate::network::peer::PeerError;
use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default limit for connecting to and reading from one peer
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest response body accepted from a peer (64 MiB)
pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Something that can report a peer's chain
pub trait ChainSource: Send + Sync {
    fn fetch_chain<'a>(&'a self, peer: &'a str) -> BoxFuture<'a, Result<ChainSnapshot, PeerError>>;
}

/// Fetches `http://{peer}/chain`
#[derive(Debug, Clone)]
pub struct HttpChainSource {
    timeout: Duration,
}

impl HttpChainSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn get_chain(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        let response = tokio::time::timeout(self.timeout, http_get(peer, "/chain"))
            .await
            .map_err(|_| PeerError::Timeout {
                peer: peer.to_string(),
            })??;

        let body = parse_response(peer, &response)?;
        serde_json::from_slice(&body).map_err(|e| PeerError::Malformed {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for HttpChainSource {
    fn default() -> Self {
        Self::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl ChainSource for HttpChainSource {
    fn fetch_chain<'a>(&'a self, peer: &'a str) -> BoxFuture<'a, Result<ChainSnapshot, PeerError>> {
        self.get_chain(peer).boxed()
    }
}

/// Send a bodiless GET and return the raw response bytes
async fn http_get(peer: &str, path: &str) -> Result<Vec<u8>, PeerError> {
    let unreachable = |e: std::io::Error| PeerError::Unreachable {
        peer: peer.to_string(),
        reason: e.to_string(),
    };

    let mut stream = TcpStream::connect(peer).await.map_err(unreachable)?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        path, peer
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(unreachable)?;

    let mut response = Vec::new();
    (&mut stream)
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut response)
        .await
        .map_err(unreachable)?;

    Ok(response)
}

/// Check the status line and return the decoded body
fn parse_response(peer: &str, response: &[u8]) -> Result<Vec<u8>, PeerError> {
    let malformed = |reason: &str| PeerError::Malformed {
        peer: peer.to_string(),
        reason: reason.to_string(),
    };

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| malformed("missing header terminator"))?;
    let head = std::str::from_utf8(&response[..split]).map_err(|_| malformed("non-UTF-8 headers"))?;
    let body = &response[split + 4..];

    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed("invalid status line"))?;

    if status != 200 {
        return Err(PeerError::BadStatus {
            peer: peer.to_string(),
            status,
        });
    }

    let chunked = lines.any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    });

    if chunked {
        decode_chunked(body).ok_or_else(|| malformed("invalid chunked body"))
    } else {
        Ok(body.to_vec())
    }
}

/// Decode a `Transfer-Encoding: chunked` body
fn decode_chunked(mut body: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = Vec::new();

    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n")?;
        let size_line = std::str::from_utf8(&body[..line_end]).ok()?;
        // Chunk extensions follow a ';'
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        body = &body[line_end + 2..];

        if size == 0 {
            return Some(decoded);
        }
        if body.len() < size + 2 {
            return None;
        }

        decoded.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Blockchain;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_plain_response() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        assert_eq!(parse_response("p:1", response).unwrap(), b"{}");
    }

    #[test]
    fn test_parse_chunked_response() {
        let response =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n{\"a\"\r\n3;ext=1\r\n:1}\r\n0\r\n\r\n";
        assert_eq!(parse_response("p:1", response).unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_parse_bad_status() {
        let response = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
        assert!(matches!(
            parse_response("p:1", response),
            Err(PeerError::BadStatus { status: 404, .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_response("p:1", b"not http at all"),
            Err(PeerError::Malformed { .. })
        ));
        assert!(decode_chunked(b"zz\r\n").is_none());
        assert!(decode_chunked(b"10\r\nshort\r\n").is_none());
    }

    #[tokio::test]
    async fn test_fetch_from_raw_server() {
        let snapshot = Blockchain::with_difficulty(2).snapshot();
        let body = serde_json::to_string(&snapshot).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let fetched = HttpChainSource::default().fetch_chain(&addr).await.unwrap();
        assert_eq!(fetched, snapshot);
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = HttpChainSource::default().fetch_chain(&addr).await;
        assert!(matches!(result, Err(PeerError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            // Accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let result = HttpChainSource::new(Duration::from_millis(200))
            .fetch_chain(&addr)
            .await;
        assert!(matches!(result, Err(PeerError::Timeout { .. })));
    }
}
