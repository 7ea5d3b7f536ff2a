//! Chain validation
//!
//! Walks a candidate chain pair by pair and checks that every block links to
//! the hash of its predecessor and carries a proof solving its predecessor's
//! puzzle. The genesis block is exempt from both checks.

use crate::core::block::Block;
use crate::mining::pow::valid_proof;
use log::debug;
use thiserror::Error;

/// Reasons a chain fails validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain has no blocks")]
    Empty,
    #[error("Block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },
    #[error("Block {index} carries an invalid proof of work")]
    InvalidProof { index: u64 },
}

/// Validate a whole chain, stopping at the first violation
pub fn validate_chain(chain: &[Block], difficulty: usize) -> Result<(), ChainError> {
    if chain.is_empty() {
        return Err(ChainError::Empty);
    }

    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        debug!(
            "Checking block {} (proof {}) against block {} (proof {})",
            current.index, current.proof, previous.index, previous.proof
        );

        if current.previous_hash != previous.hash() {
            return Err(ChainError::BrokenLink {
                index: current.index,
            });
        }

        if !valid_proof(previous.proof, current.proof, difficulty) {
            return Err(ChainError::InvalidProof {
                index: current.index,
            });
        }
    }

    Ok(())
}

/// Whether a chain passes [`validate_chain`]
pub fn is_valid_chain(chain: &[Block], difficulty: usize) -> bool {
    validate_chain(chain, difficulty).is_ok()
}
