//! In-memory session registry with per-identity mutual exclusion.
//!
//! Each identity maps to a cell holding an exclusive async operation lock
//! and the current [`Slot`]. Slot mutation is only reachable through a held
//! [`OpGuard`], so every lifecycle transition — including the settle delays
//! in the middle of one — is linearized per identity. Reads for status and
//! listing go straight to the slot without touching the operation lock.
//!
//! Lock acquisition for caller-issued operations is bounded: a short fixed
//! wait, then [`LifecycleError::Busy`]. Engine notifications acquire without
//! a bound — they must eventually apply, and the epoch check discards them
//! if their connection has been replaced in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pairgate_core::Identity;
use pairgate_engine::EngineConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::LifecycleError;
use crate::slot::{Attached, Slot, SlotKind};
use crate::workspace::Workspace;

/// How long a caller-issued operation waits for the identity lock before
/// reporting `Busy`.
const LOCK_WAIT: Duration = Duration::from_millis(250);

struct Cell {
    op: Arc<Mutex<()>>,
    slot: parking_lot::Mutex<Slot>,
    next_epoch: AtomicU64,
}

impl Cell {
    fn new() -> Self {
        Self {
            op: Arc::new(Mutex::new(())),
            slot: parking_lot::Mutex::new(Slot::Vacant),
            next_epoch: AtomicU64::new(0),
        }
    }
}

/// Sharded per-identity slot map.
#[derive(Default)]
pub struct SessionRegistry {
    cells: DashMap<Identity, Arc<Cell>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, number: &Identity) -> Arc<Cell> {
        self.cells
            .entry(number.clone())
            .or_insert_with(|| Arc::new(Cell::new()))
            .clone()
    }

    /// Acquire the identity's operation lock with a bounded wait.
    pub async fn begin(&self, number: &Identity) -> Result<OpGuard, LifecycleError> {
        let cell = self.cell(number);
        let lock = cell.op.clone();
        match tokio::time::timeout(LOCK_WAIT, lock.lock_owned()).await {
            Ok(permit) => Ok(OpGuard { cell, permit }),
            Err(_) => Err(LifecycleError::Busy(number.to_string())),
        }
    }

    /// Acquire the identity's operation lock for a notification, waiting as
    /// long as it takes.
    pub async fn begin_notification(&self, number: &Identity) -> OpGuard {
        let cell = self.cell(number);
        let lock = cell.op.clone();
        let permit = lock.lock_owned().await;
        OpGuard { cell, permit }
    }

    /// Current slot discriminant; `Vacant` for unknown identities.
    #[must_use]
    pub fn kind(&self, number: &Identity) -> SlotKind {
        self.cells
            .get(number)
            .map_or(SlotKind::Vacant, |cell| cell.slot.lock().kind())
    }

    /// Whether the identity has a Live slot.
    #[must_use]
    pub fn is_live(&self, number: &Identity) -> bool {
        self.kind(number) == SlotKind::Live
    }

    /// Number of Live slots across all identities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().slot.lock().kind() == SlotKind::Live)
            .count()
    }
}

/// Exclusive handle on one identity's cell for the duration of an operation.
///
/// All slot mutation lives here; without a guard the registry only offers
/// reads.
pub struct OpGuard {
    cell: Arc<Cell>,
    #[allow(dead_code)]
    permit: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for OpGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpGuard").finish_non_exhaustive()
    }
}

impl OpGuard {
    /// Current slot discriminant.
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        self.cell.slot.lock().kind()
    }

    /// Install a Pairing slot, returning the epoch it was installed under.
    ///
    /// The caller is responsible for having torn down any previous slot;
    /// installation unconditionally replaces whatever is present.
    pub fn install_pairing(
        &self,
        connection: Arc<dyn EngineConnection>,
        workspace: Workspace,
    ) -> u64 {
        let epoch = self.cell.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.cell.slot.lock() = Slot::Pairing(Attached {
            connection,
            workspace,
            epoch,
        });
        epoch
    }

    /// Promote the Pairing slot installed under `epoch` to Live.
    ///
    /// Returns false when the slot has since been replaced or removed.
    pub fn promote_to_live(&self, epoch: u64) -> bool {
        let mut slot = self.cell.slot.lock();
        match &*slot {
            Slot::Pairing(att) if att.epoch == epoch => {
                let att = att.clone();
                *slot = Slot::Live(att);
                true
            }
            _ => false,
        }
    }

    /// Whether the current slot was installed under `epoch`.
    #[must_use]
    pub fn epoch_is_current(&self, epoch: u64) -> bool {
        self.cell
            .slot
            .lock()
            .attached()
            .is_some_and(|att| att.epoch == epoch)
    }

    /// The current slot's workspace, if any.
    #[must_use]
    pub fn workspace(&self) -> Option<Workspace> {
        self.cell
            .slot
            .lock()
            .attached()
            .map(|att| att.workspace.clone())
    }

    /// Remove and return the current slot, leaving the identity vacant.
    #[must_use]
    pub fn take(&self) -> Slot {
        std::mem::take(&mut *self.cell.slot.lock())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
