//! Live handle registry.
//!
//! Every pointer handed out by `qvl_init` is recorded here until `qvl_deinit`
//! releases it. Calls check membership before dereferencing, so null, stale
//! and foreign pointers all map to the caller's sentinel instead of a fault.
//! The lock only guards the set; it never serializes work on a context.

use crate::types::QvlContext;
use once_cell::sync::Lazy;
use qvl_trust_mesh::TrustContext;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use tracing::error;

static LIVE_HANDLES: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn live_handles() -> MutexGuard<'static, HashSet<usize>> {
    // A panic while holding the lock cannot leave the set half-updated
    LIVE_HANDLES.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Box a context and register the resulting pointer.
pub(crate) fn register(inner: TrustContext) -> *mut QvlContext {
    let ptr = Box::into_raw(Box::new(QvlContext { inner }));
    live_handles().insert(ptr as usize);
    ptr
}

/// Unregister and free a handle. Returns false for null or unknown pointers.
pub(crate) fn release(ptr: *mut QvlContext) -> bool {
    if ptr.is_null() || !live_handles().remove(&(ptr as usize)) {
        return false;
    }
    // SAFETY: the pointer came from Box::into_raw in `register` and was live
    // until the removal above, so this is the only release.
    drop(unsafe { Box::from_raw(ptr) });
    true
}

pub(crate) fn is_live(ptr: *const QvlContext) -> bool {
    !ptr.is_null() && live_handles().contains(&(ptr as usize))
}

/// Run `f` against a live context, or return `sentinel`.
///
/// Panics inside `f` are caught here and also yield `sentinel`.
pub(crate) fn with_context<T, F>(ptr: *mut QvlContext, sentinel: T, f: F) -> T
where
    F: FnOnce(&mut TrustContext) -> T,
{
    if !is_live(ptr) {
        return sentinel;
    }
    // SAFETY: registered pointers stay valid until `release`; callers
    // serialize all access to one context.
    let context = unsafe { &mut (*ptr).inner };
    match panic::catch_unwind(AssertUnwindSafe(|| f(context))) {
        Ok(value) => value,
        Err(_) => {
            error!("panic caught at the C boundary");
            sentinel
        }
    }
}
