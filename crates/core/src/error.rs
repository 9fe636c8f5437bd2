//! Core error types

use crate::types::NodeId;
use thiserror::Error;

/// Error type shared by every QVL crate.
///
/// Only boundary and input failures live here. Domain outcomes such as a revoked
/// path or a detected negative cycle are verdicts, not errors.
#[derive(Debug, Error)]
pub enum QvlError {
    /// Identity buffer was not exactly 32 bytes
    #[error("Malformed identity: expected 32 bytes, got {len}")]
    MalformedIdentity { len: usize },

    /// Edge risk outside [-1.0, 1.0] or not finite
    #[error("Invalid risk weight: {0}")]
    InvalidRisk(f64),

    /// Trust level outside 0..=3
    #[error("Invalid trust level: {0}")]
    InvalidTrustLevel(u8),

    /// Expiration not strictly after creation
    #[error("Invalid expiration: expires_at_ns={expires_at_ns} <= timestamp_ns={timestamp_ns}")]
    InvalidExpiration { timestamp_ns: u64, expires_at_ns: u64 },

    /// No live edge for the pair
    #[error("Edge not found: {from} -> {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },

    /// Proof-of-Path bytes could not be decoded
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Node has no registered identity
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Node id space exhausted while probing for a free id
    #[error("Node id space exhausted")]
    NodeSpaceExhausted,

    /// No negative cycle evidence is available for the node
    #[error("No betrayal evidence for node {0}")]
    NoEvidence(NodeId),

    /// Proof carries more hops than the `u16` hop count can describe
    #[error("Proof too long: {hops} hops exceed the 65535 hop limit")]
    ProofTooLong { hops: usize },

    /// Evidence cycle has more edges than the `u16` edge count can describe
    #[error("Evidence too large: {edges} edges exceed the 65535 edge limit")]
    EvidenceTooLarge { edges: usize },

    /// Slash reason is not a betrayal reason
    #[error("Invalid slash reason: {0}")]
    InvalidSlashReason(u8),

    /// Slash signal bytes were not exactly one signal long
    #[error("Malformed slash signal: expected 82 bytes, got {len}")]
    MalformedSlashSignal { len: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for QVL operations.
pub type Result<T> = std::result::Result<T, QvlError>;

impl QvlError {
    /// True for errors caused by caller-supplied input rather than graph state.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            QvlError::MalformedIdentity { .. }
                | QvlError::InvalidRisk(_)
                | QvlError::InvalidTrustLevel(_)
                | QvlError::InvalidExpiration { .. }
                | QvlError::MalformedProof(_)
                | QvlError::ProofTooLong { .. }
                | QvlError::InvalidSlashReason(_)
                | QvlError::MalformedSlashSignal { .. }
        )
    }
}
