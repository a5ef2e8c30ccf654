//! # pairgate-logging
//!
//! Structured logging with `tracing`.
//!
//! The daemon calls [`init_subscriber`] once at startup; everything else
//! emits through the `tracing` macros with structured fields.

#![deny(unsafe_code)]

pub mod types;

pub use types::LogLevel;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `filter` is a default directive (e.g. `"info"`); `RUST_LOG` takes
/// precedence when set. Calling this twice is a no-op, which keeps tests
/// that initialize logging independent of ordering.
pub fn init_subscriber(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
