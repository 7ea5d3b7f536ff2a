//! Cryptographic hashing utilities for the ledger
//!
//! Provides SHA-256 hashing, the canonical JSON form that block hashes are
//! computed over, and the leading-zero difficulty check used by proof of work.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Serializes a JSON value with object keys sorted at every nesting level.
///
/// Two values holding the same fields always produce the same text, whatever
/// order the fields were inserted in.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Checks if a hex digest starts with `difficulty` zero digits
pub fn meets_difficulty(hex_digest: &str, difficulty: usize) -> bool {
    hex_digest.len() >= difficulty && hex_digest.bytes().take(difficulty).all(|b| b == b'0')
}
