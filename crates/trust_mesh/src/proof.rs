//! Proof-of-Path verification.
//!
//! A proof claims that a message travelled from a sender to a receiver over an
//! unbroken chain of live trust edges. Each hop names its edge by (from, to)
//! and carries a nonce that may be spent once per edge.
//!
//! # Wire format
//!
//! Little-endian, exact length:
//!
//! ```text
//! version u8 (=1) | sender [32] | receiver [32] | hop_count u16 |
//! hop_count x (from u32 | to u32 | nonce u64)
//! ```

use crate::graph::RiskGraph;
use qvl_core::{Identity, NodeId, QvlError, Result, IDENTITY_LEN};
use qvl_identity::IdentityRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Current proof encoding version
pub const PROOF_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + IDENTITY_LEN * 2 + 2;
const HOP_LEN: usize = 4 + 4 + 8;

/// Proof verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PopVerdict {
    Valid = 0,
    InvalidEndpoints = 1,
    BrokenLink = 2,
    Revoked = 3,
    Replay = 4,
}

impl PopVerdict {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_valid(self) -> bool {
        self == PopVerdict::Valid
    }
}

/// One hop of a proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub from: NodeId,
    pub to: NodeId,
    pub nonce: u64,
}

/// Decoded Proof-of-Path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfPath {
    pub sender: Identity,
    pub receiver: Identity,
    pub hops: Vec<Hop>,
}

impl ProofOfPath {
    pub fn new(sender: Identity, receiver: Identity, hops: Vec<Hop>) -> Self {
        Self {
            sender,
            receiver,
            hops,
        }
    }

    /// Encode to the wire format. Fails when the hop count does not fit a `u16`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.hops.len()).map_err(|_| QvlError::ProofTooLong {
            hops: self.hops.len(),
        })?;
        let mut out = Vec::with_capacity(HEADER_LEN + self.hops.len() * HOP_LEN);
        out.push(PROOF_VERSION);
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(self.receiver.as_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        for hop in &self.hops {
            out.extend_from_slice(&hop.from.to_le_bytes());
            out.extend_from_slice(&hop.to.to_le_bytes());
            out.extend_from_slice(&hop.nonce.to_le_bytes());
        }
        Ok(out)
    }

    /// Decode proof bytes, rejecting anything but an exact, bounded encoding.
    pub fn decode(bytes: &[u8], max_hops: usize) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(QvlError::MalformedProof(format!(
                "truncated header: {} bytes",
                bytes.len()
            )));
        }
        if bytes[0] != PROOF_VERSION {
            return Err(QvlError::MalformedProof(format!(
                "unsupported version {}",
                bytes[0]
            )));
        }

        let sender = Identity::from_slice(&bytes[1..1 + IDENTITY_LEN])?;
        let receiver = Identity::from_slice(&bytes[1 + IDENTITY_LEN..1 + IDENTITY_LEN * 2])?;
        let hop_count = usize::from(u16::from_le_bytes([
            bytes[HEADER_LEN - 2],
            bytes[HEADER_LEN - 1],
        ]));

        if hop_count == 0 || hop_count > max_hops {
            return Err(QvlError::MalformedProof(format!(
                "hop count {} outside 1..={}",
                hop_count, max_hops
            )));
        }
        let expected = HEADER_LEN + hop_count * HOP_LEN;
        if bytes.len() != expected {
            return Err(QvlError::MalformedProof(format!(
                "expected {} bytes for {} hops, got {}",
                expected,
                hop_count,
                bytes.len()
            )));
        }

        let hops = bytes[HEADER_LEN..]
            .chunks_exact(HOP_LEN)
            .map(|chunk| {
                let mut from = [0u8; 4];
                let mut to = [0u8; 4];
                let mut nonce = [0u8; 8];
                from.copy_from_slice(&chunk[0..4]);
                to.copy_from_slice(&chunk[4..8]);
                nonce.copy_from_slice(&chunk[8..16]);
                Hop {
                    from: u32::from_le_bytes(from),
                    to: u32::from_le_bytes(to),
                    nonce: u64::from_le_bytes(nonce),
                }
            })
            .collect();

        Ok(Self {
            sender,
            receiver,
            hops,
        })
    }
}

/// Proof-of-Path verifier
#[derive(Debug, Clone)]
pub struct PathVerifier {
    max_hops: usize,
}

impl Default for PathVerifier {
    fn default() -> Self {
        Self::new(qvl_core::ProofConfig::default().max_hops)
    }
}

impl PathVerifier {
    pub fn new(max_hops: u16) -> Self {
        Self {
            max_hops: usize::from(max_hops),
        }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Judge a proof without touching nonce state.
    pub fn evaluate(
        &self,
        graph: &RiskGraph,
        registry: &IdentityRegistry,
        proof_bytes: &[u8],
        sender: &Identity,
        receiver: &Identity,
        now_ns: u64,
    ) -> PopVerdict {
        match self.check(graph, registry, proof_bytes, sender, receiver, now_ns) {
            Ok(_) => PopVerdict::Valid,
            Err(verdict) => verdict,
        }
    }

    /// Judge a proof and, when valid, spend every hop's nonce on its edge.
    pub fn verify(
        &self,
        graph: &mut RiskGraph,
        registry: &IdentityRegistry,
        proof_bytes: &[u8],
        sender: &Identity,
        receiver: &Identity,
        now_ns: u64,
    ) -> PopVerdict {
        let proof = match self.check(graph, registry, proof_bytes, sender, receiver, now_ns) {
            Ok(proof) => proof,
            Err(verdict) => {
                debug!(?verdict, sender = %sender, receiver = %receiver, "proof rejected");
                return verdict;
            }
        };

        for hop in &proof.hops {
            graph.consume_nonce(hop.from, hop.to, hop.nonce);
        }
        debug!(hops = proof.hops.len(), sender = %sender, receiver = %receiver, "proof verified");
        PopVerdict::Valid
    }

    fn check(
        &self,
        graph: &RiskGraph,
        registry: &IdentityRegistry,
        proof_bytes: &[u8],
        sender: &Identity,
        receiver: &Identity,
        now_ns: u64,
    ) -> std::result::Result<ProofOfPath, PopVerdict> {
        let proof = ProofOfPath::decode(proof_bytes, self.max_hops).map_err(|e| {
            warn!(error = %e, "undecodable proof");
            PopVerdict::InvalidEndpoints
        })?;

        if proof.sender != *sender || proof.receiver != *receiver {
            return Err(PopVerdict::InvalidEndpoints);
        }
        let (Some(sender_node), Some(receiver_node)) =
            (registry.lookup(sender), registry.lookup(receiver))
        else {
            return Err(PopVerdict::InvalidEndpoints);
        };
        let first = proof.hops.first().map(|hop| hop.from);
        let last = proof.hops.last().map(|hop| hop.to);
        if first != Some(sender_node) || last != Some(receiver_node) {
            return Err(PopVerdict::InvalidEndpoints);
        }

        if proof.hops.windows(2).any(|pair| pair[0].to != pair[1].from) {
            return Err(PopVerdict::BrokenLink);
        }

        let mut records = Vec::with_capacity(proof.hops.len());
        for hop in &proof.hops {
            match graph.record(hop.from, hop.to) {
                Some(record) => records.push(record),
                None => return Err(PopVerdict::BrokenLink),
            }
        }

        if records.iter().any(|record| !record.is_live_at(now_ns)) {
            return Err(PopVerdict::Revoked);
        }

        let mut spent = BTreeSet::new();
        for (hop, record) in proof.hops.iter().zip(&records) {
            let fresh = hop.nonce >= record.insert_nonce()
                && !record.is_consumed(hop.nonce)
                && spent.insert((hop.from, hop.to, hop.nonce));
            if !fresh {
                warn!(from = hop.from, to = hop.to, nonce = hop.nonce, "replayed proof nonce");
                return Err(PopVerdict::Replay);
            }
        }

        Ok(proof)
    }
}
