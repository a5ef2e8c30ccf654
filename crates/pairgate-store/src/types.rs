//! Record types for the credential store.

use serde::{Deserialize, Serialize};

/// One durable session record — the unit the store persists per number.
///
/// `session_id` is opaque and regenerated on each successful link.
/// `is_new_session` marks a record whose link was established after a
/// force-repair, so downstream consumers can tell a fresh pairing from a
/// restored one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Normalized number this record belongs to.
    pub number: String,
    /// Opaque session identifier.
    pub session_id: String,
    /// Serialized credential blob from the protocol engine.
    pub creds: String,
    /// Whether the session should be reconnected on startup.
    pub active: bool,
    /// Set when the link was freshly established (post force-repair).
    pub is_new_session: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
    /// RFC 3339 timestamp of the last successful link, if any.
    pub connected_at: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
