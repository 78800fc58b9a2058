//! Common types, thresholds and error handling.

use thiserror::Error;

/// Position of a node in the roster; doubles as its share index.
pub type NodeId = u32;

pub trait Wire: Sized {
    // Canonical byte encoding for network transport.
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self, Error>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("invalid encoding")]
    InvalidEncoding,
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
    #[error("proof verification failed for share {index}")]
    InvalidProof { index: NodeId },
    #[error("not enough shares: required {required}, provided {provided}")]
    NotEnoughShares { required: usize, provided: usize },
    #[error("duplicate share index {0}")]
    DuplicateShare(NodeId),
    #[error("precondition failed: {0}")]
    Precondition(&'static str),
    #[error("broadcast failed for {failed} of {attempted} nodes (tolerance {tolerance})")]
    Broadcast {
        failed: usize,
        attempted: usize,
        tolerance: usize,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("outcome already published")]
    OutcomePublished,
    #[error("run dropped before publishing an outcome")]
    OutcomeAbandoned,
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Number of faulty or dishonest nodes a roster of `n` tolerates.
pub fn fault_tolerance(n: usize) -> usize {
    n.saturating_sub(1) / 3
}

/// Byzantine threshold `n - floor((n-1)/3)` for a roster of `n`.
pub fn byzantine_threshold(n: usize) -> usize {
    n - fault_tolerance(n)
}

pub fn validate_threshold(n: usize, threshold: usize) -> Result<(), Error> {
    if n == 0 {
        return Err(Error::InvalidParams("roster must not be empty".into()));
    }
    if threshold == 0 || threshold > n {
        return Err(Error::InvalidParams(format!(
            "threshold {threshold} outside 1..={n}"
        )));
    }
    Ok(())
}
