//! Errors reported back to callers of the ledger engine
//!
//! Anything a caller supplied that the engine refuses to act on surfaces as a
//! [`ValidationError`]. Failures the engine recovers from on its own (a peer that
//! cannot be reached, a peer chain that does not validate) live with the
//! component that recovers from them.

use thiserror::Error;

/// Malformed caller input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Sender {0:?} is reserved for mining rewards")]
    ReservedSender(String),
    #[error("Please supply a valid, non-empty list of nodes")]
    EmptyPeerList,
    #[error("Invalid peer address {address:?}: {reason}")]
    InvalidPeerAddress { address: String, reason: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
