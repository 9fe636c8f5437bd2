//! Scoring, detection and verification FFI functions.

use crate::handle;
use crate::types::{QvlAnomalyScore, QvlContext, QvlPopVerdict};
use qvl_core::{Identity, IDENTITY_LEN};
use qvl_trust_mesh::SLASH_SIGNAL_LEN;
use tracing::debug;

/// Read a 32-byte identity from a caller buffer.
///
/// # Safety
///
/// `ptr`, when not NULL, must point to 32 readable bytes.
unsafe fn read_identity(ptr: *const u8) -> Option<Identity> {
    if ptr.is_null() {
        return None;
    }
    Identity::from_slice(std::slice::from_raw_parts(ptr, IDENTITY_LEN)).ok()
}

// ============================================================================
// Trust Scores
// ============================================================================

/// Trust score of an identity.
///
/// # Returns
///
/// A score in [0, 1]; 0.5 for identities never seen; -1.0 when the handle is
/// invalid, `did` is NULL or `did_len` is not 32.
///
/// # Safety
///
/// `did`, when not NULL, must point to `did_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn qvl_get_trust_score(
    ctx: *mut QvlContext,
    did: *const u8,
    did_len: usize,
) -> f64 {
    if did.is_null() {
        return -1.0;
    }
    let did = std::slice::from_raw_parts(did, did_len);
    handle::with_context(ctx, -1.0, |context| context.trust_score(did).unwrap_or(-1.0))
}

/// Reputation of a node in [0, 1]; -1.0 for an invalid handle.
#[no_mangle]
pub extern "C" fn qvl_get_reputation(ctx: *mut QvlContext, node_id: u32) -> f64 {
    handle::with_context(ctx, -1.0, |context| context.reputation(node_id))
}

// ============================================================================
// Betrayal
// ============================================================================

/// Run betrayal detection from `source`.
///
/// An invalid handle yields `{source, 0.0, NONE}`.
#[no_mangle]
pub extern "C" fn qvl_detect_betrayal(ctx: *mut QvlContext, source: u32) -> QvlAnomalyScore {
    handle::with_context(ctx, QvlAnomalyScore::clean(source), |context| {
        context.detect_betrayal(source).into()
    })
}

/// Encode the worst negative cycle reachable from `node_id`.
///
/// # Returns
///
/// The encoded evidence length, or 0 when there is no evidence or the handle
/// is invalid. Bytes are written only when `buf_len` is at least that length,
/// so callers may probe with a NULL buffer first.
///
/// # Safety
///
/// `out_buf`, when not NULL, must point to `buf_len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn qvl_get_betrayal_evidence(
    ctx: *mut QvlContext,
    node_id: u32,
    out_buf: *mut u8,
    buf_len: u32,
) -> u32 {
    handle::with_context(ctx, 0, |context| {
        let Ok(evidence) = context.betrayal_evidence(node_id) else {
            return 0;
        };
        let Ok(encoded) = evidence.encode() else {
            return 0;
        };
        let Ok(len) = u32::try_from(encoded.len()) else {
            return 0;
        };
        if !out_buf.is_null() && buf_len >= len {
            std::ptr::copy_nonoverlapping(encoded.as_ptr(), out_buf, encoded.len());
        }
        len
    })
}

/// Build an 82-byte slash signal against `target_did`.
///
/// # Returns
///
/// 0 on success; -1 for a malformed target, a reason outside 1..=3, NULL
/// buffers or an invalid handle.
///
/// # Safety
///
/// - `target_did` and `evidence_hash` must point to 32 readable bytes.
/// - `out_signal` must point to 82 writable bytes.
#[no_mangle]
pub unsafe extern "C" fn qvl_issue_slash_signal(
    ctx: *mut QvlContext,
    target_did: *const u8,
    reason: u8,
    evidence_hash: *const u8,
    out_signal: *mut u8,
) -> i32 {
    if target_did.is_null() || evidence_hash.is_null() || out_signal.is_null() {
        return -1;
    }
    let target = std::slice::from_raw_parts(target_did, IDENTITY_LEN);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(std::slice::from_raw_parts(evidence_hash, 32));

    handle::with_context(ctx, -1, |context| {
        match context.issue_slash_signal(target, reason, hash) {
            Ok(signal) => {
                std::ptr::copy_nonoverlapping(signal.to_bytes().as_ptr(), out_signal, SLASH_SIGNAL_LEN);
                0
            }
            Err(e) => {
                debug!(error = %e, "slash signal rejected");
                -1
            }
        }
    })
}

// ============================================================================
// Proof-of-Path
// ============================================================================

/// Verify a serialized Proof-of-Path, spending its nonces when valid.
///
/// Invalid handles and NULL buffers yield `INVALID_ENDPOINTS`.
///
/// # Safety
///
/// - `proof_bytes` must point to `proof_len` readable bytes.
/// - `sender_did` and `receiver_did` must point to 32 readable bytes.
#[no_mangle]
pub unsafe extern "C" fn qvl_verify_pop(
    ctx: *mut QvlContext,
    proof_bytes: *const u8,
    proof_len: usize,
    sender_did: *const u8,
    receiver_did: *const u8,
) -> QvlPopVerdict {
    if proof_bytes.is_null() {
        return QvlPopVerdict::InvalidEndpoints;
    }
    let (Some(sender), Some(receiver)) = (read_identity(sender_did), read_identity(receiver_did))
    else {
        return QvlPopVerdict::InvalidEndpoints;
    };
    let proof = std::slice::from_raw_parts(proof_bytes, proof_len);

    handle::with_context(ctx, QvlPopVerdict::InvalidEndpoints, |context| {
        context.verify_pop(proof, &sender, &receiver).into()
    })
}
