//! SQL data access for session records.
//!
//! All methods take a `&Connection` parameter and are stateless — pure
//! functions that translate between Rust types and SQL. The pool-owning
//! service lives in [`crate::store`].

use pairgate_core::{Identity, SessionId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::types::SessionRecord;

/// Get current UTC timestamp as an RFC 3339 string.
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Session repository — stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Upsert the credential blob for a number.
    ///
    /// A new record gets a fresh session ID and `active = true`; an existing
    /// record only has its blob and `updated_at` refreshed — the session ID
    /// is regenerated on link, not on every credential rotation.
    pub fn upsert_credentials(
        conn: &Connection,
        number: &Identity,
        creds: &str,
    ) -> Result<SessionRecord> {
        let now = now_rfc3339();
        let session_id = SessionId::new();
        let _ = conn.execute(
            "INSERT INTO sessions (number, session_id, creds, active, is_new_session, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, 0, ?4, ?4)
             ON CONFLICT(number) DO UPDATE SET creds = excluded.creds, updated_at = excluded.updated_at",
            params![number.as_str(), session_id.as_str(), creds, now],
        )?;

        Self::get(conn, number)?
            .ok_or_else(|| crate::errors::StoreError::RecordMissing(number.to_string()))
    }

    /// Mark a number as linked: fresh session ID, `active = true`, and the
    /// `is_new_session` flag as given.
    ///
    /// Returns false if no record exists for the number.
    pub fn mark_linked(conn: &Connection, number: &Identity, new_session: bool) -> Result<bool> {
        let now = now_rfc3339();
        let session_id = SessionId::new();
        let changed = conn.execute(
            "UPDATE sessions
             SET session_id = ?1, active = 1, is_new_session = ?2, connected_at = ?3, updated_at = ?3
             WHERE number = ?4",
            params![session_id.as_str(), new_session, now, number.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Set the active flag. Returns false if no record exists.
    pub fn set_active(conn: &Connection, number: &Identity, active: bool) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET active = ?1, updated_at = ?2 WHERE number = ?3",
            params![active, now_rfc3339(), number.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Get a record by number.
    pub fn get(conn: &Connection, number: &Identity) -> Result<Option<SessionRecord>> {
        let record = conn
            .query_row(
                "SELECT * FROM sessions WHERE number = ?1",
                params![number.as_str()],
                |row| Ok(record_from_row(row)),
            )
            .optional()?;
        Ok(record)
    }

    /// Get a record by number, only if it is active.
    pub fn get_active(conn: &Connection, number: &Identity) -> Result<Option<SessionRecord>> {
        let record = conn
            .query_row(
                "SELECT * FROM sessions WHERE number = ?1 AND active = 1",
                params![number.as_str()],
                |row| Ok(record_from_row(row)),
            )
            .optional()?;
        Ok(record)
    }

    /// List every active record, oldest first.
    pub fn list_active(conn: &Connection) -> Result<Vec<SessionRecord>> {
        let mut stmt =
            conn.prepare("SELECT * FROM sessions WHERE active = 1 ORDER BY created_at")?;
        let records = stmt
            .query_map([], |row| Ok(record_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Delete a record. Returns true if a row was deleted.
    pub fn delete(conn: &Connection, number: &Identity) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM sessions WHERE number = ?1",
            params![number.as_str()],
        )?;
        Ok(changed > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row converter
// ─────────────────────────────────────────────────────────────────────────────

fn record_from_row(row: &rusqlite::Row<'_>) -> SessionRecord {
    SessionRecord {
        number: row.get_unwrap("number"),
        session_id: row.get_unwrap("session_id"),
        creds: row.get_unwrap("creds"),
        active: row.get_unwrap("active"),
        is_new_session: row.get_unwrap("is_new_session"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
        connected_at: row.get_unwrap("connected_at"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
