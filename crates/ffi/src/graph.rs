//! Graph and identity FFI functions.

use crate::handle;
use crate::types::{QvlContext, QvlRiskEdge};
use qvl_core::IDENTITY_LEN;
use tracing::debug;

/// Insert or replace a trust edge.
///
/// # Returns
///
/// 0 on success; -1 for a malformed edge, a NULL edge pointer or an invalid
/// handle.
///
/// # Safety
///
/// `edge`, when not NULL, must point to a valid `QvlRiskEdge`.
#[no_mangle]
pub unsafe extern "C" fn qvl_add_trust_edge(ctx: *mut QvlContext, edge: *const QvlRiskEdge) -> i32 {
    if edge.is_null() {
        return -1;
    }
    let edge = *edge;
    handle::with_context(ctx, -1, |context| match context.add_edge(edge.into()) {
        Ok(()) => 0,
        Err(e) => {
            debug!(error = %e, "add_trust_edge rejected");
            -1
        }
    })
}

/// Revoke the live edge `from -> to`.
///
/// # Returns
///
/// 0 on success; -2 when there is no live edge or the handle is invalid.
#[no_mangle]
pub extern "C" fn qvl_revoke_trust_edge(ctx: *mut QvlContext, from: u32, to: u32) -> i32 {
    handle::with_context(ctx, -2, |context| match context.revoke_edge(from, to) {
        Ok(_) => 0,
        Err(_) => -2,
    })
}

/// Resolve a 32-byte identity to its node id, registering it on first sight.
///
/// # Returns
///
/// true with `*out_id` written on success.
///
/// # Safety
///
/// - `did` must point to 32 readable bytes.
/// - `out_id` must point to a writable `uint32_t`.
#[no_mangle]
pub unsafe extern "C" fn qvl_register_node(
    ctx: *mut QvlContext,
    did: *const u8,
    out_id: *mut u32,
) -> bool {
    if did.is_null() || out_id.is_null() {
        return false;
    }
    let did = std::slice::from_raw_parts(did, IDENTITY_LEN);
    handle::with_context(ctx, false, |context| match context.register_node(did) {
        Ok(node) => {
            *out_id = node;
            true
        }
        Err(_) => false,
    })
}

/// Copy the identity registered for `node_id` into `out_did`.
///
/// # Returns
///
/// false for unknown nodes, NULL buffers or an invalid handle.
///
/// # Safety
///
/// `out_did` must point to 32 writable bytes.
#[no_mangle]
pub unsafe extern "C" fn qvl_get_did(ctx: *mut QvlContext, node_id: u32, out_did: *mut u8) -> bool {
    if out_did.is_null() {
        return false;
    }
    handle::with_context(ctx, false, |context| match context.identity_of(node_id) {
        Some(identity) => {
            std::ptr::copy_nonoverlapping(identity.as_bytes().as_ptr(), out_did, IDENTITY_LEN);
            true
        }
        None => false,
    })
}
