//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the protocol engine boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No engine backend is configured in this deployment.
    #[error("protocol engine is not configured")]
    NotConfigured,

    /// Opening a connection failed (handshake, transport).
    #[error("failed to open connection: {0}")]
    Open(String),

    /// The pairing code request was rejected or timed out.
    #[error("pairing code request failed: {0}")]
    PairingCode(String),

    /// Protocol-level logout failed.
    #[error("logout failed: {0}")]
    Logout(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
