//! Startup recovery: reconnect every active record.
//!
//! Runs once at process start, after migrations and before the HTTP
//! listener accepts traffic. Each identity goes through the orchestrator's
//! connect path exactly as an external caller would — same locking, same
//! error handling — and one identity's failure never aborts the others.

use pairgate_core::Identity;
use tracing::{debug, error, info};

use crate::orchestrator::{ConnectOutcome, Orchestrator};
use crate::slot::SlotKind;

/// Counts from one recovery pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Identities whose connect path was invoked successfully.
    pub resumed: usize,
    /// Identities skipped because a slot already existed.
    pub skipped: usize,
    /// Identities whose connect attempt failed.
    pub failed: usize,
}

/// Replay every active durable record through the connect path.
pub async fn resume_active_sessions(orchestrator: &Orchestrator) -> RecoveryReport {
    let mut report = RecoveryReport::default();

    let records = match orchestrator.store().list_active() {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "recovery aborted: could not list active records");
            return report;
        }
    };

    info!(count = records.len(), "recovering active sessions");

    for record in records {
        let Ok(number) = Identity::sanitize(&record.number) else {
            error!(number = %record.number, "skipping record with malformed number");
            report.failed += 1;
            continue;
        };

        if orchestrator.slot_kind(&number) != SlotKind::Vacant {
            debug!(number = %number, "slot already present, skipping");
            report.skipped += 1;
            continue;
        }

        match orchestrator.connect(number.as_str(), false).await {
            Ok(ConnectOutcome::Initiated { .. }) => {
                info!(number = %number, "reconnect initiated");
                report.resumed += 1;
            }
            Ok(ConnectOutcome::AlreadyConnected { .. }) => {
                report.skipped += 1;
            }
            Err(e) => {
                error!(number = %number, error = %e, "reconnect failed");
                report.failed += 1;
            }
        }
    }

    info!(
        resumed = report.resumed,
        skipped = report.skipped,
        failed = report.failed,
        "recovery complete"
    );
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
