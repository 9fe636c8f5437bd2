//! Context lifecycle FFI functions.

use crate::handle;
use crate::types::QvlContext;
use qvl_core::logging::DEFAULT_FILTER;
use qvl_core::QvlConfig;
use qvl_trust_mesh::TrustContext;
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_ENV: &str = "QVL_CONFIG";

fn load_config() -> QvlConfig {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return QvlConfig::default();
    };
    match QvlConfig::from_file(&path) {
        Ok(config) => {
            info!(path = %path, "loaded configuration");
            config
        }
        Err(e) => {
            warn!(path = %path, error = %format!("{:#}", e), "falling back to default configuration");
            QvlConfig::default()
        }
    }
}

fn init_impl() -> *mut QvlContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let context = match TrustContext::with_config(load_config()) {
        Ok(context) => context,
        Err(e) => {
            warn!(error = %e, "invalid configuration, using defaults");
            TrustContext::new()
        }
    };
    handle::register(context)
}

/// Create a new trust context.
///
/// # Returns
///
/// A handle to the context, or NULL on failure. The handle must be released
/// with `qvl_deinit`.
///
/// # Example
///
/// ```c
/// QvlContext* ctx = qvl_init();
/// if (ctx == NULL) {
///     // Handle error
/// }
/// ```
#[no_mangle]
pub extern "C" fn qvl_init() -> *mut QvlContext {
    std::panic::catch_unwind(init_impl).unwrap_or(std::ptr::null_mut())
}

/// Release a trust context.
///
/// Safe on NULL and on handles that were already released.
#[no_mangle]
pub extern "C" fn qvl_deinit(ctx: *mut QvlContext) {
    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
        if handle::release(ctx) {
            info!("trust context released");
        }
    }));
}

/// Move the logical evaluation clock forward.
///
/// Earlier values leave the clock unchanged.
///
/// # Returns
///
/// 0 on success, -1 for an invalid handle.
#[no_mangle]
pub extern "C" fn qvl_advance_clock(ctx: *mut QvlContext, now_ns: u64) -> i32 {
    handle::with_context(ctx, -1, |context| {
        context.advance_clock(now_ns);
        0
    })
}
