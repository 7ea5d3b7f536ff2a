//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing
//! - Canonical JSON serialization for hashing structured data
//! - Hex-digest difficulty checks

pub mod hash;

pub use hash::{canonical_json, meets_difficulty, sha256, sha256_hex};
