//! Proof of work for the ledger
//!
//! A proof `p'` is valid for the previous proof `p` when the SHA-256 of the
//! decimal text `"{p}{p'}"` starts with `difficulty` zero hex digits. The search
//! is a plain linear scan from zero, so the proof found for a given previous
//! proof is always the same.

use crate::crypto::{meets_difficulty, sha256_hex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of leading zero hex digits a proof hash must have
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Hex digits in a SHA-256 digest; no proof can satisfy a higher difficulty
pub const MAX_DIFFICULTY: usize = 64;

/// How many candidates are tried between checks of the cancel flag
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Check whether `proof` solves the puzzle posed by `last_proof`
pub fn valid_proof(last_proof: u64, proof: u64, difficulty: usize) -> bool {
    let guess = format!("{}{}", last_proof, proof);
    meets_difficulty(&sha256_hex(guess.as_bytes()), difficulty)
}

/// Find the smallest proof that solves the puzzle posed by `last_proof`.
///
/// Blocks the calling thread until a proof is found; async callers should run
/// it through `tokio::task::spawn_blocking`. Never returns for a difficulty
/// above [`MAX_DIFFICULTY`].
pub fn find_proof(last_proof: u64, difficulty: usize) -> u64 {
    let mut proof = 0u64;
    while !valid_proof(last_proof, proof, difficulty) {
        proof += 1;
    }
    proof
}

/// Same search as [`find_proof`], abandoned with `None` once `cancel` is set
pub fn find_proof_cancellable(last_proof: u64, difficulty: usize, cancel: &AtomicBool) -> Option<u64> {
    let mut proof = 0u64;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }
        if valid_proof(last_proof, proof, difficulty) {
            return Some(proof);
        }
        proof += 1;
    }
}
