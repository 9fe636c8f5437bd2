//! Trust Mesh Engine
//!
//! This crate implements the QVL trust substrate on top of the identity
//! registry:
//! - Risk graph of time-bounded, revocable trust edges with tombstones
//! - Reputation aggregation and identity trust scoring
//! - Betrayal detection (negative cycles, gossip coverage, belief propagation)
//! - Proof-of-Path verification with per-edge replay protection
//! - Slash signal construction for upstream enforcement
//!
//! [`TrustContext`] ties these together and is the unit of ownership exposed
//! across the C boundary.

pub mod belief;
pub mod betrayal;
pub mod context;
pub mod graph;
pub mod proof;
pub mod slashing;
pub mod trust;

pub use belief::{BeliefOutcome, BeliefPropagation};
pub use betrayal::{AnomalyReason, AnomalyScore, BetrayalDetector, BetrayalEvidence, CRITICAL_SCORE};
pub use context::TrustContext;
pub use graph::{EdgeRecord, Neighbors, RiskGraph};
pub use proof::{Hop, PathVerifier, PopVerdict, ProofOfPath, PROOF_VERSION};
pub use slashing::{SlashSignal, SLASH_SIGNAL_LEN};
pub use trust::{ReputationAggregator, ReputationRecord, TrustScorer};

pub use qvl_core::{Identity, NodeId, QvlConfig, QvlError, Result, RiskEdge, NEUTRAL_SCORE};
