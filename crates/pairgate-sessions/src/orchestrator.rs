//! Lifecycle orchestration: generate-code, connect, force-repair,
//! disconnect, delete, status, list.
//!
//! Every operation takes the identity's operation lock for its entire
//! duration, settle delays included. Engine notifications are consumed by a
//! per-connection pump task that takes the same lock and checks the slot
//! epoch before mutating, so a replaced connection's events can never
//! clobber newer state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pairgate_core::Identity;
use pairgate_engine::{CloseOutcome, ConnectionProvider, EngineConnection, EngineEvent};
use pairgate_store::SessionStore;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{LifecycleError, Result};
use crate::registry::{OpGuard, SessionRegistry};
use crate::slot::SlotKind;
use crate::workspace::Workspace;

/// Wait after tearing down a connection before reusing its identity, so the
/// engine can release underlying resources.
const TEARDOWN_SETTLE: Duration = Duration::from_millis(1500);

/// Wait before requesting a pairing code on a fresh connection; the engine's
/// handshake needs this long to be ready for the request.
const PAIRING_REQUEST_SETTLE: Duration = Duration::from_secs(2);

/// Longer settle used by force-repair between teardown and recreation.
const REPAIR_SETTLE: Duration = Duration::from_secs(5);

/// What a terminal logout does to the durable record.
#[derive(Clone, Copy, Debug)]
enum TerminalPolicy {
    /// Pairing-path connections: the record is deleted outright.
    PurgeRecord,
    /// Connect-path connections: the record stays but `active` is cleared,
    /// so the number needs re-pairing rather than vanishing.
    DeactivateRecord,
}

/// How to tear an existing connection down.
#[derive(Clone, Copy, Debug)]
enum Teardown {
    /// Close the transport.
    Close,
    /// Attempt a protocol-level logout first, then close.
    LogoutThenClose,
}

/// Result of a generate-code or force-repair call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairingOutcome {
    /// A pairing code was issued for the caller to enter on the handset.
    CodeIssued {
        /// Normalized number.
        number: Identity,
        /// One-time pairing code.
        pair_code: String,
    },
    /// The workspace already holds a registered session; it is being
    /// restored instead of paired.
    RestoringExisting {
        /// Normalized number.
        number: Identity,
    },
}

/// Result of a connect call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A connection was opened and is linking.
    Initiated {
        /// Normalized number.
        number: Identity,
    },
    /// A live connection already exists; nothing was done.
    AlreadyConnected {
        /// Normalized number.
        number: Identity,
    },
}

/// One row of the session listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Normalized number.
    pub number: String,
    /// Opaque session identifier.
    pub session_id: String,
    /// Whether a live connection currently exists.
    pub connected: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
}

/// The per-identity connection lifecycle manager.
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    store: SessionStore,
    engine: Arc<dyn ConnectionProvider>,
    workspace_root: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator over the given store and engine.
    #[must_use]
    pub fn new(
        store: SessionStore,
        engine: Arc<dyn ConnectionProvider>,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            store,
            engine,
            workspace_root,
        }
    }

    /// Reset an identity and start a fresh pairing attempt.
    ///
    /// Any existing slot is torn down first — this is an implicit "reset and
    /// retry", not a precondition failure. Returns the pairing code, or
    /// reports that an already-registered session is being restored.
    #[instrument(skip_all, fields(number = raw_number))]
    pub async fn generate_code(&self, raw_number: &str) -> Result<PairingOutcome> {
        let number = Identity::sanitize(raw_number)?;
        let guard = self.registry.begin(&number).await?;

        let had_slot = self.teardown_slot(&guard, &number, Teardown::Close).await;
        let _ = self.store.delete(&number)?;
        if let Err(e) = Workspace::remove_at(&self.workspace_root, &number) {
            warn!(number = %number, error = %e, "failed to remove old workspace");
        }
        if had_slot {
            tokio::time::sleep(TEARDOWN_SETTLE).await;
        }

        self.begin_pairing(&guard, &number, false).await
    }

    /// Re-establish a connection from the stored credentials.
    ///
    /// Requires an active durable record. An existing live connection is
    /// left alone unless `force` is set, in which case it is closed and
    /// replaced.
    #[instrument(skip_all, fields(number = raw_number, force = force))]
    pub async fn connect(&self, raw_number: &str, force: bool) -> Result<ConnectOutcome> {
        let number = Identity::sanitize(raw_number)?;
        let guard = self.registry.begin(&number).await?;

        let record = self
            .store
            .get_active(&number)?
            .ok_or_else(|| LifecycleError::NoSavedSession(number.to_string()))?;

        match guard.kind() {
            SlotKind::Live if !force => {
                debug!(number = %number, "already connected, nothing to do");
                return Ok(ConnectOutcome::AlreadyConnected { number });
            }
            SlotKind::Pairing if !force => {
                return Err(LifecycleError::Conflict(number.to_string()));
            }
            SlotKind::Live | SlotKind::Pairing => {
                let _ = self.teardown_slot(&guard, &number, Teardown::Close).await;
                tokio::time::sleep(TEARDOWN_SETTLE).await;
            }
            SlotKind::Vacant => {}
        }

        let workspace = Workspace::restore(&self.workspace_root, &number, &record.creds)?;
        let opened = self.engine.open(workspace.dir()).await?;
        let epoch = guard.install_pairing(opened.connection.clone(), workspace);
        self.spawn_event_pump(
            number.clone(),
            epoch,
            opened.events,
            TerminalPolicy::DeactivateRecord,
            false,
        );

        info!(number = %number, "connection restore initiated");
        Ok(ConnectOutcome::Initiated { number })
    }

    /// Nuclear reset: logout/close whatever exists, purge record and
    /// workspace, then run the pairing path again.
    ///
    /// Never leaves a partial slot — any failure after teardown leaves the
    /// identity absent.
    #[instrument(skip_all, fields(number = raw_number))]
    pub async fn force_repair(&self, raw_number: &str) -> Result<PairingOutcome> {
        let number = Identity::sanitize(raw_number)?;
        let guard = self.registry.begin(&number).await?;

        let _ = self
            .teardown_slot(&guard, &number, Teardown::LogoutThenClose)
            .await;
        let _ = self.store.delete(&number)?;
        if let Err(e) = Workspace::remove_at(&self.workspace_root, &number) {
            warn!(number = %number, error = %e, "failed to remove old workspace");
        }
        tokio::time::sleep(REPAIR_SETTLE).await;

        self.begin_pairing(&guard, &number, true).await
    }

    /// Close the live connection, leaving the durable record untouched so a
    /// later connect can resume without re-pairing.
    #[instrument(skip_all, fields(number = raw_number))]
    pub async fn disconnect(&self, raw_number: &str) -> Result<Identity> {
        let number = Identity::sanitize(raw_number)?;
        let guard = self.registry.begin(&number).await?;

        if guard.kind() != SlotKind::Live {
            return Err(LifecycleError::NotConnected(number.to_string()));
        }

        if let Some(att) = guard.take().into_attached() {
            self.close_logged(&number, att.connection.as_ref()).await;
        }
        info!(number = %number, "disconnected");
        Ok(number)
    }

    /// Remove every trace of an identity: slot, record, workspace.
    ///
    /// Idempotent — succeeds even when the identity had no prior state.
    #[instrument(skip_all, fields(number = raw_number))]
    pub async fn delete(&self, raw_number: &str) -> Result<Identity> {
        let number = Identity::sanitize(raw_number)?;
        let guard = self.registry.begin(&number).await?;

        let _ = self.teardown_slot(&guard, &number, Teardown::Close).await;
        let _ = self.store.delete(&number)?;
        if let Err(e) = Workspace::remove_at(&self.workspace_root, &number) {
            warn!(number = %number, error = %e, "failed to remove workspace");
        }
        info!(number = %number, "session deleted");
        Ok(number)
    }

    /// Whether the identity currently has a live connection. Pure read.
    #[must_use]
    pub fn is_connected(&self, number: &Identity) -> bool {
        self.registry.is_live(number)
    }

    /// Current slot discriminant for an identity. Pure read.
    #[must_use]
    pub fn slot_kind(&self, number: &Identity) -> SlotKind {
        self.registry.kind(number)
    }

    /// Number of live connections across all identities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }

    /// All active durable records, cross-referenced with live slots.
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let records = self.store.list_active()?;
        Ok(records
            .into_iter()
            .map(|record| {
                let connected = Identity::sanitize(&record.number)
                    .map(|id| self.registry.is_live(&id))
                    .unwrap_or(false);
                SessionInfo {
                    number: record.number,
                    session_id: record.session_id,
                    connected,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                }
            })
            .collect())
    }

    /// The credential store this orchestrator writes through.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────

    /// Shared creation path for generate-code and force-repair: fresh
    /// workspace, open, install Pairing, wire the pump, request a code if
    /// the connection is unregistered.
    async fn begin_pairing(
        &self,
        guard: &OpGuard,
        number: &Identity,
        new_session: bool,
    ) -> Result<PairingOutcome> {
        let workspace = Workspace::create(&self.workspace_root, number)?;
        let opened = self.engine.open(workspace.dir()).await?;
        let connection = opened.connection.clone();
        let epoch = guard.install_pairing(connection.clone(), workspace);
        self.spawn_event_pump(
            number.clone(),
            epoch,
            opened.events,
            TerminalPolicy::PurgeRecord,
            new_session,
        );

        if connection.is_registered() {
            info!(number = %number, "existing registration found, restoring");
            return Ok(PairingOutcome::RestoringExisting {
                number: number.clone(),
            });
        }

        tokio::time::sleep(PAIRING_REQUEST_SETTLE).await;
        match connection.request_pairing_code(number.as_str()).await {
            Ok(pair_code) => {
                info!(number = %number, "pairing code issued");
                Ok(PairingOutcome::CodeIssued {
                    number: number.clone(),
                    pair_code,
                })
            }
            Err(e) => {
                // The identity must not be left owning a failed object.
                if let Some(att) = guard.take().into_attached() {
                    self.close_logged(number, att.connection.as_ref()).await;
                }
                Err(e.into())
            }
        }
    }

    /// Best-effort teardown of whatever slot is present. Returns true when
    /// a slot existed. Sub-failures are logged, never propagated.
    async fn teardown_slot(&self, guard: &OpGuard, number: &Identity, mode: Teardown) -> bool {
        let Some(att) = guard.take().into_attached() else {
            return false;
        };

        if matches!(mode, Teardown::LogoutThenClose) && att.connection.is_registered() {
            if let Err(e) = att.connection.logout().await {
                warn!(number = %number, error = %e, "logout failed, falling back to close");
            }
        }
        self.close_logged(number, att.connection.as_ref()).await;
        true
    }

    /// Close a connection, logging the already-closed case as a warning.
    async fn close_logged(&self, number: &Identity, connection: &dyn EngineConnection) {
        match connection.close().await {
            CloseOutcome::Closed => debug!(number = %number, "connection closed"),
            CloseOutcome::AlreadyClosed => {
                warn!(number = %number, "connection was already closed");
            }
        }
    }

    /// Consume one connection's event stream.
    ///
    /// Each event takes the identity's lock and re-checks the slot epoch;
    /// events from a connection that has since been replaced are discarded
    /// and the pump exits.
    fn spawn_event_pump(
        &self,
        number: Identity,
        epoch: u64,
        mut events: mpsc::Receiver<EngineEvent>,
        policy: TerminalPolicy,
        new_session: bool,
    ) {
        let registry = self.registry.clone();
        let store = self.store.clone();

        drop(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let guard = registry.begin_notification(&number).await;
                if !guard.epoch_is_current(epoch) {
                    debug!(number = %number, ?event, "event from replaced connection, ignoring");
                    break;
                }

                match event {
                    EngineEvent::CredentialsUpdated => {
                        let Some(workspace) = guard.workspace() else {
                            break;
                        };
                        match workspace.read_credentials() {
                            Ok(creds) => {
                                if let Err(e) = store.upsert_credentials(&number, &creds) {
                                    error!(number = %number, error = %e, "failed to persist credentials");
                                }
                            }
                            Err(e) => {
                                warn!(number = %number, error = %e, "credential blob unreadable");
                            }
                        }
                    }
                    EngineEvent::Opened => {
                        if guard.promote_to_live(epoch) {
                            if let Err(e) = store.mark_linked(&number, new_session) {
                                error!(number = %number, error = %e, "failed to mark record linked");
                            }
                            info!(number = %number, "connection linked");
                        }
                    }
                    EngineEvent::Closed { terminal: false } => {
                        debug!(number = %number, "connection closed (transient)");
                    }
                    EngineEvent::Closed { terminal: true } => {
                        info!(number = %number, "terminal logout received, purging");
                        let slot = guard.take();
                        match policy {
                            TerminalPolicy::PurgeRecord => {
                                if let Err(e) = store.delete(&number) {
                                    error!(number = %number, error = %e, "failed to delete record");
                                }
                            }
                            TerminalPolicy::DeactivateRecord => {
                                if let Err(e) = store.set_active(&number, false) {
                                    error!(number = %number, error = %e, "failed to deactivate record");
                                }
                            }
                        }
                        if let Some(att) = slot.into_attached() {
                            if let Err(e) = att.workspace.remove() {
                                warn!(number = %number, error = %e, "failed to remove workspace");
                            }
                        }
                        break;
                    }
                }
            }
        }));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use pairgate_engine::testing::FakeEngine;
    use pairgate_store::{new_in_memory, run_migrations, ConnectionConfig};

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        engine: FakeEngine,
        root: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        let engine = FakeEngine::new();
        let root = tempfile::tempdir().unwrap();
        let orchestrator = Arc::new(Orchestrator::new(
            SessionStore::new(pool),
            Arc::new(engine.clone()),
            root.path().to_path_buf(),
        ));
        Harness {
            orchestrator,
            engine,
            root,
        }
    }

    fn num(s: &str) -> Identity {
        Identity::sanitize(s).unwrap()
    }

    /// Let spawned event pumps run; the paused clock auto-advances.
    async fn drain() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn write_creds(h: &Harness, number: &str, creds: &str) {
        let dir = h.root.path().join(format!("session_{number}"));
        std::fs::write(dir.join("creds.json"), creds).unwrap();
    }

    // ── generate-code ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn generate_code_sanitizes_and_issues_code() {
        let h = harness();
        h.engine.set_pair_code("WXYZ-1234");

        let outcome = h.orchestrator.generate_code("44 7700 900000").await.unwrap();
        assert_eq!(
            outcome,
            PairingOutcome::CodeIssued {
                number: num("447700900000"),
                pair_code: "WXYZ-1234".into(),
            }
        );
        assert_eq!(
            h.orchestrator.slot_kind(&num("447700900000")),
            SlotKind::Pairing
        );
        assert!(h.root.path().join("session_447700900000").is_dir());
        assert_eq!(
            h.engine.calls(),
            vec!["open:session_447700900000", "pairing_code:447700900000"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_restores_registered_session() {
        let h = harness();
        h.engine.set_registered(true);

        let outcome = h.orchestrator.generate_code("100").await.unwrap();
        assert_eq!(
            outcome,
            PairingOutcome::RestoringExisting { number: num("100") }
        );
        // No pairing code was requested.
        assert_eq!(h.engine.calls(), vec!["open:session_100"]);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_replaces_existing_attempt() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        h.orchestrator.generate_code("100").await.unwrap();

        // The prior connection is closed before the new one opens.
        assert_eq!(
            h.engine.calls(),
            vec![
                "open:session_100",
                "pairing_code:100",
                "close",
                "open:session_100",
                "pairing_code:100",
            ]
        );
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Pairing);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_rejects_invalid_number() {
        let h = harness();
        let err = h.orchestrator.generate_code("   ").await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidNumber(_)));
        assert_eq!(h.engine.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_open_failure_leaves_absent() {
        let h = harness();
        h.engine.set_fail_open(true);

        let err = h.orchestrator.generate_code("100").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Engine(_)));
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_pairing_failure_releases_slot() {
        let h = harness();
        h.engine.set_fail_pairing(true);

        let err = h.orchestrator.generate_code("100").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Engine(_)));
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
        assert!(h.engine.last_connection().unwrap().is_closed());
    }

    // ── engine notifications ────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn credentials_update_persists_blob() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        write_creds(&h, "100", "{\"k\":1}");

        let conn = h.engine.last_connection().unwrap();
        conn.emit(EngineEvent::CredentialsUpdated).await;
        drain().await;

        let record = h.orchestrator.store().get(&num("100")).unwrap().unwrap();
        assert_eq!(record.creds, "{\"k\":1}");
        assert!(record.active);
    }

    #[tokio::test(start_paused = true)]
    async fn opened_promotes_to_live() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        write_creds(&h, "100", "{}");

        let conn = h.engine.last_connection().unwrap();
        conn.emit(EngineEvent::CredentialsUpdated).await;
        conn.emit(EngineEvent::Opened).await;
        drain().await;

        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Live);
        let record = h.orchestrator.store().get(&num("100")).unwrap().unwrap();
        assert!(record.active);
        assert!(!record.is_new_session);
        assert!(record.connected_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_close_on_pairing_purges_everything() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        write_creds(&h, "100", "{}");

        let conn = h.engine.last_connection().unwrap();
        conn.emit(EngineEvent::CredentialsUpdated).await;
        drain().await;
        conn.emit(EngineEvent::Closed { terminal: true }).await;
        drain().await;

        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
        assert!(h.orchestrator.store().get(&num("100")).unwrap().is_none());
        assert!(!h.root.path().join("session_100").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_close_is_ignored() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();

        let conn = h.engine.last_connection().unwrap();
        conn.emit(EngineEvent::Closed { terminal: false }).await;
        drain().await;

        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Pairing);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_connection_events_are_discarded() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        h.orchestrator.generate_code("100").await.unwrap();

        // The first connection was replaced; its events must not mutate the
        // new slot.
        let old = h.engine.connection(0).unwrap();
        old.emit(EngineEvent::Opened).await;
        drain().await;
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Pairing);

        let current = h.engine.connection(1).unwrap();
        current.emit(EngineEvent::Opened).await;
        drain().await;
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Live);
    }

    // ── connect ─────────────────────────────────────────────────────────

    async fn linked(h: &Harness, number: &str) {
        h.orchestrator
            .store()
            .upsert_credentials(&num(number), "{\"seed\":true}")
            .unwrap();
        let outcome = h.orchestrator.connect(number, false).await.unwrap();
        assert_eq!(
            outcome,
            ConnectOutcome::Initiated {
                number: num(number)
            }
        );
        h.engine
            .last_connection()
            .unwrap()
            .emit(EngineEvent::Opened)
            .await;
        drain().await;
        assert_eq!(h.orchestrator.slot_kind(&num(number)), SlotKind::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_without_record_is_not_found() {
        let h = harness();
        let err = h.orchestrator.connect("999", false).await.unwrap_err();
        assert!(matches!(err, LifecycleError::NoSavedSession(n) if n == "999"));
        assert_eq!(h.engine.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_restores_workspace_from_record() {
        let h = harness();
        linked(&h, "100").await;

        let creds = std::fs::read_to_string(
            h.root.path().join("session_100").join("creds.json"),
        )
        .unwrap();
        assert_eq!(creds, "{\"seed\":true}");
    }

    #[tokio::test(start_paused = true)]
    async fn connect_when_live_without_force_is_a_no_op() {
        let h = harness();
        linked(&h, "100").await;
        let opens = h.engine.open_count();

        let outcome = h.orchestrator.connect("100", false).await.unwrap();
        assert_eq!(
            outcome,
            ConnectOutcome::AlreadyConnected { number: num("100") }
        );
        assert_eq!(h.engine.open_count(), opens, "no provider calls expected");
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_with_force_closes_before_opening() {
        let h = harness();
        linked(&h, "100").await;

        let outcome = h.orchestrator.connect("100", true).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Initiated { number: num("100") });
        assert_eq!(
            h.engine.calls(),
            vec!["open:session_100", "close", "open:session_100"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_conflicts_with_inflight_pairing() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();
        write_creds(&h, "100", "{}");
        h.engine
            .last_connection()
            .unwrap()
            .emit(EngineEvent::CredentialsUpdated)
            .await;
        drain().await;

        let err = h.orchestrator.connect("100", false).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(n) if n == "100"));

        // Force replaces the pairing attempt.
        let outcome = h.orchestrator.connect("100", true).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Initiated { number: num("100") });
    }

    #[tokio::test(start_paused = true)]
    async fn connect_terminal_logout_deactivates_record() {
        let h = harness();
        linked(&h, "100").await;

        h.engine
            .last_connection()
            .unwrap()
            .emit(EngineEvent::Closed { terminal: true })
            .await;
        drain().await;

        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
        let record = h.orchestrator.store().get(&num("100")).unwrap().unwrap();
        assert!(!record.active, "record is kept but needs re-pairing");
    }

    // ── force-repair ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn force_repair_logs_out_then_reissues_code() {
        let h = harness();
        h.engine.set_registered(true);
        linked(&h, "100").await;
        h.engine.set_registered(false);

        let outcome = h.orchestrator.force_repair("100").await.unwrap();
        assert!(matches!(outcome, PairingOutcome::CodeIssued { .. }));
        assert_eq!(
            h.engine.calls(),
            vec![
                "open:session_100",
                "logout",
                "close",
                "open:session_100",
                "pairing_code:100",
            ]
        );

        // The fresh link is flagged as a new session.
        write_creds(&h, "100", "{}");
        let conn = h.engine.last_connection().unwrap();
        conn.emit(EngineEvent::CredentialsUpdated).await;
        conn.emit(EngineEvent::Opened).await;
        drain().await;
        let record = h.orchestrator.store().get(&num("100")).unwrap().unwrap();
        assert!(record.is_new_session);
    }

    #[tokio::test(start_paused = true)]
    async fn force_repair_failure_leaves_identity_absent() {
        let h = harness();
        linked(&h, "100").await;
        h.engine.set_fail_open(true);

        let err = h.orchestrator.force_repair("100").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Engine(_)));
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
    }

    #[tokio::test(start_paused = true)]
    async fn force_repair_tears_down_pairing_slot_too() {
        let h = harness();
        h.orchestrator.generate_code("100").await.unwrap();

        let outcome = h.orchestrator.force_repair("100").await.unwrap();
        assert!(matches!(outcome, PairingOutcome::CodeIssued { .. }));
        // The unregistered pairing connection is closed without a logout.
        assert!(!h.engine.calls().contains(&"logout".to_string()));
        assert!(h.engine.connection(0).unwrap().is_closed());
    }

    // ── disconnect / delete ─────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn disconnect_requires_live_slot() {
        let h = harness();
        let err = h.orchestrator.disconnect("999").await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotConnected(n) if n == "999"));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_leaves_record_for_reconnect() {
        let h = harness();
        linked(&h, "100").await;

        h.orchestrator.disconnect("100").await.unwrap();
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
        assert!(h.engine.last_connection().unwrap().is_closed());

        let record = h.orchestrator.store().get(&num("100")).unwrap().unwrap();
        assert!(record.active, "disconnect must not touch the record");

        // Reconnect works from the same record.
        let outcome = h.orchestrator.connect("100", false).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Initiated { number: num("100") });
    }

    #[tokio::test(start_paused = true)]
    async fn delete_twice_reports_success_both_times() {
        let h = harness();
        linked(&h, "100").await;

        h.orchestrator.delete("100").await.unwrap();
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Vacant);
        assert!(h.orchestrator.store().get(&num("100")).unwrap().is_none());
        assert!(!h.root.path().join("session_100").exists());

        // Second delete: nothing left, still succeeds.
        h.orchestrator.delete("100").await.unwrap();
    }

    // ── concurrency ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn busy_while_another_operation_holds_the_lock() {
        let h = harness();
        let guard = h.orchestrator.registry.begin(&num("100")).await.unwrap();

        let err = h.orchestrator.disconnect("100").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Busy(n) if n == "100"));
        drop(guard);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_generate_code_admits_one_winner() {
        let h = harness();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let orch = h.orchestrator.clone();
                tokio::spawn(async move { orch.generate_code("100").await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let mut ok = 0;
        let mut busy = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(LifecycleError::Busy(_)) => busy += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(busy, 2);
        assert_eq!(h.engine.open_count(), 1);
        assert_eq!(h.orchestrator.slot_kind(&num("100")), SlotKind::Pairing);
    }

    // ── listing ─────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn list_sessions_cross_references_live_slots() {
        let h = harness();
        linked(&h, "100").await;
        h.orchestrator
            .store()
            .upsert_credentials(&num("200"), "{}")
            .unwrap();

        let sessions = h.orchestrator.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        let by_number = |n: &str| sessions.iter().find(|s| s.number == n).unwrap();
        assert!(by_number("100").connected);
        assert!(!by_number("200").connected);
    }
}
