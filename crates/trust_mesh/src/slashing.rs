//! Slash Signals - Betrayal Reports for Upstream Enforcement
//!
//! A slash signal is a fixed-layout payload naming a betrayer, why it was
//! flagged, and a hash of the evidence. The substrate only builds the
//! payload; signing and broadcast happen upstream.
//!
//! # Layout
//!
//! | Offset | Size | Field                     |
//! |--------|------|---------------------------|
//! | 0      | 32   | target identity           |
//! | 32     | 1    | reason code (1..=3)       |
//! | 33     | 32   | evidence hash             |
//! | 65     | 8    | timestamp_ns (LE)         |
//! | 73     | 1    | severity (0..=255)        |
//! | 74     | 8    | nonce (LE)                |

use crate::betrayal::AnomalyReason;
use qvl_core::{Identity, QvlError, Result, IDENTITY_LEN};
use serde::{Deserialize, Serialize};

/// Encoded size of a slash signal
pub const SLASH_SIGNAL_LEN: usize = 82;

const REASON_OFFSET: usize = 32;
const EVIDENCE_OFFSET: usize = 33;
const TIMESTAMP_OFFSET: usize = 65;
const SEVERITY_OFFSET: usize = 73;
const NONCE_OFFSET: usize = 74;

/// Report of a betrayal, ready for signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashSignal {
    pub target: Identity,
    pub reason: AnomalyReason,
    /// BLAKE3 digest of the supporting evidence
    pub evidence_hash: [u8; 32],
    pub timestamp_ns: u64,
    /// Anomaly score scaled to 0..=255
    pub severity: u8,
    pub nonce: u64,
}

impl SlashSignal {
    /// Build a signal. `reason` must name an actual betrayal finding.
    pub fn new(
        target: Identity,
        reason: AnomalyReason,
        evidence_hash: [u8; 32],
        timestamp_ns: u64,
        severity: u8,
        nonce: u64,
    ) -> Result<Self> {
        if reason == AnomalyReason::None {
            return Err(QvlError::InvalidSlashReason(reason.code()));
        }
        Ok(Self {
            target,
            reason,
            evidence_hash,
            timestamp_ns,
            severity,
            nonce,
        })
    }

    pub fn to_bytes(&self) -> [u8; SLASH_SIGNAL_LEN] {
        let mut out = [0u8; SLASH_SIGNAL_LEN];
        out[..IDENTITY_LEN].copy_from_slice(self.target.as_bytes());
        out[REASON_OFFSET] = self.reason.code();
        out[EVIDENCE_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.evidence_hash);
        out[TIMESTAMP_OFFSET..SEVERITY_OFFSET].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        out[SEVERITY_OFFSET] = self.severity;
        out[NONCE_OFFSET..].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SLASH_SIGNAL_LEN {
            return Err(QvlError::MalformedSlashSignal { len: bytes.len() });
        }

        let target = Identity::from_slice(&bytes[..IDENTITY_LEN])?;
        let code = bytes[REASON_OFFSET];
        let reason = AnomalyReason::from_code(code).ok_or(QvlError::InvalidSlashReason(code))?;

        let mut evidence_hash = [0u8; 32];
        evidence_hash.copy_from_slice(&bytes[EVIDENCE_OFFSET..TIMESTAMP_OFFSET]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[TIMESTAMP_OFFSET..SEVERITY_OFFSET]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[NONCE_OFFSET..]);

        Self::new(
            target,
            reason,
            evidence_hash,
            u64::from_le_bytes(timestamp),
            bytes[SEVERITY_OFFSET],
            u64::from_le_bytes(nonce),
        )
    }

    /// BLAKE3 digest of the encoded signal, for upstream signing
    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.to_bytes()).as_bytes()
    }
}

/// Parse a reason code, accepting only betrayal reasons.
pub fn slash_reason(code: u8) -> Result<AnomalyReason> {
    match AnomalyReason::from_code(code) {
        Some(AnomalyReason::None) | None => Err(QvlError::InvalidSlashReason(code)),
        Some(reason) => Ok(reason),
    }
}

/// Scale an anomaly score in [0, 1] to a severity byte.
pub fn severity_from_score(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 255.0).round() as u8
}
