//! Test support: scripted engine fakes.
//!
//! [`FakeEngine`] implements [`ConnectionProvider`] with fully scripted
//! behavior — registration state, pairing codes, and failures are set up
//! front, every provider call lands in an ordered call log, and each opened
//! [`FakeConnection`] exposes an event injector so tests can drive the
//! asynchronous notification path.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::traits::{CloseOutcome, ConnectionProvider, EngineConnection, OpenedConnection};

#[derive(Clone)]
struct FakeConfig {
    registered: bool,
    pair_code: String,
    fail_open: bool,
    fail_pairing: bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            registered: false,
            pair_code: "ABCD-1234".to_string(),
            fail_open: false,
            fail_pairing: false,
        }
    }
}

/// Scripted engine for tests.
#[derive(Clone, Default)]
pub struct FakeEngine {
    config: Arc<Mutex<FakeConfig>>,
    calls: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<Vec<Arc<FakeConnection>>>>,
}

impl FakeEngine {
    /// Create a fake whose connections start unregistered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether connections opened from now on report as registered.
    pub fn set_registered(&self, registered: bool) {
        self.config.lock().registered = registered;
    }

    /// Pairing code returned by future connections.
    pub fn set_pair_code(&self, code: impl Into<String>) {
        self.config.lock().pair_code = code.into();
    }

    /// Make future `open` calls fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.config.lock().fail_open = fail;
    }

    /// Make future pairing code requests fail.
    pub fn set_fail_pairing(&self, fail: bool) {
        self.config.lock().fail_pairing = fail;
    }

    /// Ordered log of every provider/connection call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of successful opens.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// The most recently opened connection, if any.
    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<FakeConnection>> {
        self.connections.lock().last().cloned()
    }

    /// Connection by open order.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<Arc<FakeConnection>> {
        self.connections.lock().get(index).cloned()
    }
}

#[async_trait]
impl ConnectionProvider for FakeEngine {
    async fn open(&self, workspace_dir: &Path) -> Result<OpenedConnection, EngineError> {
        let dir = workspace_dir
            .file_name()
            .map_or_else(|| workspace_dir.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.calls.lock().push(format!("open:{dir}"));

        let config = self.config.lock().clone();
        if config.fail_open {
            return Err(EngineError::Open("scripted open failure".into()));
        }

        let (events_tx, events_rx) = mpsc::channel(16);
        let conn = Arc::new(FakeConnection {
            registered: config.registered,
            pair_code: config.pair_code,
            fail_pairing: config.fail_pairing,
            closed: AtomicBool::new(false),
            events_tx,
            calls: self.calls.clone(),
        });
        self.connections.lock().push(conn.clone());

        Ok(OpenedConnection {
            connection: conn,
            events: events_rx,
        })
    }
}

/// One scripted connection handed out by [`FakeEngine`].
pub struct FakeConnection {
    registered: bool,
    pair_code: String,
    fail_pairing: bool,
    closed: AtomicBool,
    events_tx: mpsc::Sender<EngineEvent>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeConnection {
    /// Inject a lifecycle event as if the engine had emitted it.
    pub async fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event).await;
    }

    /// Whether `close` has been called at least once.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineConnection for FakeConnection {
    fn is_registered(&self) -> bool {
        self.registered
    }

    async fn request_pairing_code(&self, number: &str) -> Result<String, EngineError> {
        self.calls.lock().push(format!("pairing_code:{number}"));
        if self.fail_pairing {
            return Err(EngineError::PairingCode("scripted pairing failure".into()));
        }
        Ok(self.pair_code.clone())
    }

    async fn logout(&self) -> Result<(), EngineError> {
        self.calls.lock().push("logout".to_string());
        Ok(())
    }

    async fn close(&self) -> CloseOutcome {
        self.calls.lock().push("close".to_string());
        if self.closed.swap(true, Ordering::SeqCst) {
            CloseOutcome::AlreadyClosed
        } else {
            CloseOutcome::Closed
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
