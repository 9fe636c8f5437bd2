//! # qvl-ffi
//!
//! C ABI for the QVL trust substrate. The matching header lives in
//! `include/qvl.h`.
//!
//! ## Safety
//!
//! - Every function validates its handle against the set of live contexts
//!   before touching it; NULL, released and foreign handles return the
//!   function's documented sentinel
//! - Panics never cross the boundary; they are caught and turned into the
//!   same sentinel
//! - Identity buffers are always exactly 32 bytes
//! - A context is not internally synchronized: callers must serialize calls
//!   against one handle, and may use separate handles from separate threads

mod handle;

pub mod graph;
pub mod lifecycle;
pub mod query;
pub mod types;

pub use graph::{qvl_add_trust_edge, qvl_get_did, qvl_register_node, qvl_revoke_trust_edge};
pub use lifecycle::{qvl_advance_clock, qvl_deinit, qvl_init, CONFIG_ENV};
pub use query::{
    qvl_detect_betrayal, qvl_get_betrayal_evidence, qvl_get_reputation, qvl_get_trust_score,
    qvl_issue_slash_signal, qvl_verify_pop,
};
pub use types::{QvlAnomalyReason, QvlAnomalyScore, QvlContext, QvlPopVerdict, QvlRiskEdge};
