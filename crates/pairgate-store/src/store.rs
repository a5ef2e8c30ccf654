//! Pool-owning store service.
//!
//! [`SessionStore`] is the interface the orchestrator and recovery service
//! talk to. Each call checks a connection out of the pool and delegates to
//! the stateless [`SessionRepo`] functions.

use pairgate_core::Identity;
use tracing::debug;

use crate::connection::ConnectionPool;
use crate::errors::Result;
use crate::repository::SessionRepo;
use crate::types::SessionRecord;

/// Credential store service over the `SQLite` pool.
#[derive(Clone)]
pub struct SessionStore {
    pool: ConnectionPool,
}

impl SessionStore {
    /// Create a store over an already-migrated pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Upsert the credential blob for a number.
    pub fn upsert_credentials(&self, number: &Identity, creds: &str) -> Result<SessionRecord> {
        let conn = self.pool.get()?;
        let record = SessionRepo::upsert_credentials(&conn, number, creds)?;
        debug!(number = %number, "credentials persisted");
        Ok(record)
    }

    /// Mark a number as linked (fresh session ID, active, `is_new_session`).
    pub fn mark_linked(&self, number: &Identity, new_session: bool) -> Result<bool> {
        let conn = self.pool.get()?;
        SessionRepo::mark_linked(&conn, number, new_session)
    }

    /// Set the active flag for a number.
    pub fn set_active(&self, number: &Identity, active: bool) -> Result<bool> {
        let conn = self.pool.get()?;
        SessionRepo::set_active(&conn, number, active)
    }

    /// Get a record by number.
    pub fn get(&self, number: &Identity) -> Result<Option<SessionRecord>> {
        let conn = self.pool.get()?;
        SessionRepo::get(&conn, number)
    }

    /// Get a record by number, only if active.
    pub fn get_active(&self, number: &Identity) -> Result<Option<SessionRecord>> {
        let conn = self.pool.get()?;
        SessionRepo::get_active(&conn, number)
    }

    /// List every active record.
    pub fn list_active(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.pool.get()?;
        SessionRepo::list_active(&conn)
    }

    /// Delete a record. Returns true if a row was deleted.
    pub fn delete(&self, number: &Identity) -> Result<bool> {
        let conn = self.pool.get()?;
        let deleted = SessionRepo::delete(&conn, number)?;
        if deleted {
            debug!(number = %number, "record deleted");
        }
        Ok(deleted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
