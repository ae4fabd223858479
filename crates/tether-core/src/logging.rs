#![forbid(unsafe_code)]

//! Structured logging.
//!
//! All tether crates log through [`tracing`]. This module re-exports the
//! macros so downstream platform glue does not need its own dependency, and
//! behind the `tracing-json` feature provides a JSON subscriber suitable for
//! production log shipping.
//!
//! The filter is read from `TETHER_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `info`.

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "TETHER_LOG";

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
