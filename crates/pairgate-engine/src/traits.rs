//! Provider and connection traits.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::EngineError;
use crate::events::EngineEvent;

/// Outcome of closing a connection.
///
/// Close is idempotent: closing an already-closed handle is a warning for
/// the caller to log, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The connection was open and has been closed.
    Closed,
    /// The connection was already closed.
    AlreadyClosed,
}

/// A connection handle plus its event stream, as returned by
/// [`ConnectionProvider::open`].
pub struct OpenedConnection {
    /// The shared connection handle.
    pub connection: Arc<dyn EngineConnection>,
    /// Lifecycle notifications for this connection. The stream ends when
    /// the engine drops its sender (after a close).
    pub events: mpsc::Receiver<EngineEvent>,
}

impl std::fmt::Debug for OpenedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedConnection").finish_non_exhaustive()
    }
}

/// Produces engine connections from per-identity credential workspaces.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open a connection using whatever credential material is present in
    /// `workspace_dir`. An empty workspace yields an unregistered connection
    /// that must be paired; a restored workspace resumes the stored session.
    async fn open(&self, workspace_dir: &Path) -> Result<OpenedConnection, EngineError>;
}

/// One live (or linking) engine connection.
#[async_trait]
pub trait EngineConnection: Send + Sync {
    /// Whether the credentials this connection was opened with are already
    /// registered with the remote network.
    fn is_registered(&self) -> bool;

    /// Request a one-time pairing code linking `number` to this connection.
    /// Only meaningful while unregistered.
    async fn request_pairing_code(&self, number: &str) -> Result<String, EngineError>;

    /// Protocol-level logout, revoking the link on the remote side.
    async fn logout(&self) -> Result<(), EngineError>;

    /// Close the connection. Safe to call any number of times.
    async fn close(&self) -> CloseOutcome;
}
