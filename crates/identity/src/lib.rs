//! Identity management for the QVL trust substrate.
//!
//! Agents are named by opaque 32-byte identities (DIDs). The risk graph works on
//! compact `u32` node ids instead; this crate owns the mapping between the two.
//!
//! # Security Model
//!
//! - Identity buffers of any length other than 32 bytes are rejected before they
//!   reach the graph
//! - Node ids are derived deterministically from the identity hash, so the same
//!   identity maps to the same id for the life of a context
//! - Authenticity of an identity is established upstream; the registry does not
//!   verify signatures

pub mod registry;

pub use registry::{derive_node_id, IdentityRegistry};

// Re-export core types for convenience
pub use qvl_core::{Identity, NodeId, QvlError, Result, IDENTITY_LEN};
