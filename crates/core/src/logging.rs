//! Structured logging infrastructure for QVL.
//!
//! Library code only emits `tracing` events; hosts choose how they are rendered.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// Returns `false` when a global subscriber was already installed.
///
/// # Example
/// ```no_run
/// use qvl_core::logging;
///
/// logging::init();
/// tracing::info!("context ready");
/// ```
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init()
        .is_ok()
}

/// Initialize the logging system with JSON output for log aggregation.
///
/// # Example
/// ```no_run
/// use qvl_core::logging;
///
/// logging::init_json();
/// tracing::info!(component = "qvl", "context ready");
/// ```
pub fn init_json() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .try_init()
        .is_ok()
}
