//! FFI-safe types and structures.

use qvl_trust_mesh::{AnomalyReason, AnomalyScore, NodeId, PopVerdict, RiskEdge, TrustContext};

// ============================================================================
// Opaque Handle
// ============================================================================

/// Opaque handle to one trust context.
///
/// Created by `qvl_init` and released by `qvl_deinit`. C callers only ever
/// see the pointer.
pub struct QvlContext {
    pub(crate) inner: TrustContext,
}

// ============================================================================
// Edges
// ============================================================================

/// Risk edge as passed by C callers
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct QvlRiskEdge {
    pub from: u32,
    pub to: u32,
    /// -1.0 (betrayal) to +1.0 (full trust)
    pub risk: f64,
    pub timestamp_ns: u64,
    pub nonce: u64,
    /// 0..=3
    pub level: u8,
    pub expires_at_ns: u64,
}

impl From<QvlRiskEdge> for RiskEdge {
    fn from(edge: QvlRiskEdge) -> Self {
        RiskEdge {
            from: edge.from,
            to: edge.to,
            risk: edge.risk,
            timestamp_ns: edge.timestamp_ns,
            nonce: edge.nonce,
            level: edge.level,
            expires_at_ns: edge.expires_at_ns,
        }
    }
}

// ============================================================================
// Verdicts and Anomalies
// ============================================================================

/// Proof-of-Path verdict codes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QvlPopVerdict {
    Valid = 0,
    InvalidEndpoints = 1,
    BrokenLink = 2,
    Revoked = 3,
    Replay = 4,
}

impl From<PopVerdict> for QvlPopVerdict {
    fn from(verdict: PopVerdict) -> Self {
        match verdict {
            PopVerdict::Valid => QvlPopVerdict::Valid,
            PopVerdict::InvalidEndpoints => QvlPopVerdict::InvalidEndpoints,
            PopVerdict::BrokenLink => QvlPopVerdict::BrokenLink,
            PopVerdict::Revoked => QvlPopVerdict::Revoked,
            PopVerdict::Replay => QvlPopVerdict::Replay,
        }
    }
}

/// Anomaly reason codes, carried as a `u8` in [`QvlAnomalyScore`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QvlAnomalyReason {
    None = 0,
    NegativeCycle = 1,
    LowCoverage = 2,
    BpDivergence = 3,
}

impl From<AnomalyReason> for QvlAnomalyReason {
    fn from(reason: AnomalyReason) -> Self {
        match reason {
            AnomalyReason::None => QvlAnomalyReason::None,
            AnomalyReason::NegativeCycle => QvlAnomalyReason::NegativeCycle,
            AnomalyReason::LowCoverage => QvlAnomalyReason::LowCoverage,
            AnomalyReason::BpDivergence => QvlAnomalyReason::BpDivergence,
        }
    }
}

/// Result of betrayal detection
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QvlAnomalyScore {
    pub node: u32,
    /// 0.0 to 1.0 (0.9+ = critical)
    pub score: f64,
    /// One of the [`QvlAnomalyReason`] codes
    pub reason: u8,
}

impl QvlAnomalyScore {
    pub(crate) fn clean(node: NodeId) -> Self {
        Self {
            node,
            score: 0.0,
            reason: QvlAnomalyReason::None as u8,
        }
    }
}

impl From<AnomalyScore> for QvlAnomalyScore {
    fn from(anomaly: AnomalyScore) -> Self {
        Self {
            node: anomaly.node,
            score: anomaly.score,
            reason: QvlAnomalyReason::from(anomaly.reason) as u8,
        }
    }
}
