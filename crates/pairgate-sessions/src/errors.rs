//! Lifecycle error taxonomy.
//!
//! Caller-facing failures are structured; internal cleanup steps swallow and
//! log their own sub-failures so a secondary error never masks the primary
//! outcome. Nothing here is retried automatically — `force` is the explicit
//! caller-driven retry mechanism.

use pairgate_core::InvalidNumber;
use pairgate_engine::EngineError;
use pairgate_store::StoreError;
use thiserror::Error;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The supplied number was missing or contained no digits.
    #[error("number is required and must contain digits")]
    InvalidNumber(#[from] InvalidNumber),

    /// The per-identity lock could not be acquired within the bounded wait.
    #[error("another operation is already in progress for {0}")]
    Busy(String),

    /// A pairing attempt is in flight; retry with force to replace it.
    #[error("a pairing attempt is already in progress for {0}")]
    Conflict(String),

    /// No active durable record exists for the number.
    #[error("no saved session found for {0}; generate a pair code first")]
    NoSavedSession(String),

    /// The number has no live connection.
    #[error("no active connection found for {0}")]
    NotConnected(String),

    /// The protocol engine failed on the operation itself.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The durable store was unreachable; in-memory state is unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Credential workspace I/O failed.
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
