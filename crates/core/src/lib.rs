//! Core functionality for the QVL (Quasar Vector Lattice) trust substrate.
//!
//! This crate provides the shared types, error handling, configuration and
//! logging used by the identity registry, the trust mesh engine and the C
//! boundary.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::{ClockMode, EvaluationClock};
pub use config::{BetrayalConfig, ClockConfig, ProofConfig, QvlConfig, ReputationConfig};
pub use error::{QvlError, Result};
pub use types::{Identity, NodeId, RiskEdge, IDENTITY_LEN, MAX_TRUST_LEVEL};

/// Reputation reported for nodes without live incoming edges
pub const NEUTRAL_SCORE: f64 = 0.5;
