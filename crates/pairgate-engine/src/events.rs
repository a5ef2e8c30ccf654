//! Typed lifecycle notifications from an engine connection.

/// A lifecycle notification emitted by one engine connection.
///
/// Events arrive asynchronously relative to caller-issued operations; the
/// consumer is responsible for serializing them against its own mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine rewrote its credential material in the workspace; the
    /// durable record should be refreshed from disk.
    CredentialsUpdated,
    /// The connection finished linking and is fully open.
    Opened,
    /// The connection closed. `terminal` means the remote side revoked the
    /// link (logged out) — the session cannot be resumed with the stored
    /// credentials.
    Closed {
        /// True when the remote side revoked the link.
        terminal: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
