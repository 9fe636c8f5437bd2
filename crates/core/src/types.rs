//! Core types

use crate::error::{QvlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact numeric node identifier
pub type NodeId = u32;

/// Length of an identity (DID) in bytes
pub const IDENTITY_LEN: usize = 32;

/// Highest ordinal trust level an edge may carry
pub const MAX_TRUST_LEVEL: u8 = 3;

/// Opaque 32-byte agent identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an identity from an untrusted buffer.
    ///
    /// Any length other than 32 bytes is a malformed-input condition.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; IDENTITY_LEN] = bytes
            .try_into()
            .map_err(|_| QvlError::MalformedIdentity { len: bytes.len() })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Identity {
    type Error = QvlError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty for log correlation
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", hex::encode(self.0))
    }
}

/// Directed, time-bounded risk assertion between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEdge {
    /// Source node ID
    pub from: NodeId,
    /// Target node ID
    pub to: NodeId,
    /// -1.0 to 1.0 (negative = betrayal)
    pub risk: f64,
    /// Creation time in nanoseconds since epoch
    pub timestamp_ns: u64,
    /// Provenance sequence number
    pub nonce: u64,
    /// Trust level 0-3
    pub level: u8,
    /// Expiration time in nanoseconds since epoch
    pub expires_at_ns: u64,
}

impl RiskEdge {
    /// Check field ranges without touching any graph state.
    pub fn validate(&self) -> Result<()> {
        if !self.risk.is_finite() || !(-1.0..=1.0).contains(&self.risk) {
            return Err(QvlError::InvalidRisk(self.risk));
        }
        if self.level > MAX_TRUST_LEVEL {
            return Err(QvlError::InvalidTrustLevel(self.level));
        }
        if self.expires_at_ns <= self.timestamp_ns {
            return Err(QvlError::InvalidExpiration {
                timestamp_ns: self.timestamp_ns,
                expires_at_ns: self.expires_at_ns,
            });
        }
        Ok(())
    }

    /// An edge is expired once the evaluation clock reaches its expiration.
    pub fn is_expired_at(&self, now_ns: u64) -> bool {
        now_ns >= self.expires_at_ns
    }

    /// Weight contributed by the edge's ordinal trust level, in (0, 1].
    pub fn level_weight(&self) -> f64 {
        (f64::from(self.level.min(MAX_TRUST_LEVEL)) + 1.0) / (f64::from(MAX_TRUST_LEVEL) + 1.0)
    }

    /// Remaining fraction of the edge's lifetime at `now_ns`, in [0, 1].
    ///
    /// Edges stamped in the future of the clock count as fresh.
    pub fn recency_at(&self, now_ns: u64) -> f64 {
        if now_ns <= self.timestamp_ns {
            return 1.0;
        }
        if now_ns >= self.expires_at_ns {
            return 0.0;
        }
        let lifetime = (self.expires_at_ns - self.timestamp_ns) as f64;
        let remaining = (self.expires_at_ns - now_ns) as f64;
        (remaining / lifetime).clamp(0.0, 1.0)
    }
}
