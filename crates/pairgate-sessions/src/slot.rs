//! Per-identity connection slot.

use std::sync::Arc;

use pairgate_engine::EngineConnection;
use serde::Serialize;

use crate::workspace::Workspace;

/// A connection bound to a slot, together with its workspace and the epoch
/// it was installed under.
///
/// The epoch is bumped every time a slot is installed for an identity, so an
/// event pump attached to an older connection can detect that it has been
/// replaced and must not mutate state.
#[derive(Clone)]
pub struct Attached {
    /// Shared engine connection handle.
    pub connection: Arc<dyn EngineConnection>,
    /// Credential workspace owned for the duration of the slot.
    pub workspace: Workspace,
    /// Installation epoch within this identity's cell.
    pub epoch: u64,
}

/// The in-memory state of one identity.
///
/// Invariant: an identity occupies exactly zero or one of {Pairing, Live} at
/// any instant — the enum makes holding both unrepresentable; the registry's
/// per-identity lock makes transitions atomic.
#[derive(Clone, Default)]
pub enum Slot {
    /// No attempt in progress, no live connection.
    #[default]
    Vacant,
    /// A connection mid-handshake, not yet linked.
    Pairing(Attached),
    /// A connection that has completed linking.
    Live(Attached),
}

impl Slot {
    /// Discriminant without the payload.
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Vacant => SlotKind::Vacant,
            Self::Pairing(_) => SlotKind::Pairing,
            Self::Live(_) => SlotKind::Live,
        }
    }

    /// The attached connection, for Pairing and Live slots.
    #[must_use]
    pub fn attached(&self) -> Option<&Attached> {
        match self {
            Self::Vacant => None,
            Self::Pairing(att) | Self::Live(att) => Some(att),
        }
    }

    /// Consume the slot, yielding the attachment if any.
    #[must_use]
    pub fn into_attached(self) -> Option<Attached> {
        match self {
            Self::Vacant => None,
            Self::Pairing(att) | Self::Live(att) => Some(att),
        }
    }
}

/// Slot discriminant, readable without the per-identity lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// No slot.
    Vacant,
    /// Handshake in progress.
    Pairing,
    /// Linked and connected.
    Live,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
