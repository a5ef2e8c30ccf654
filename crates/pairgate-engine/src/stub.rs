//! Stub provider for deployments without a configured engine backend.

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::errors::EngineError;
use crate::traits::{ConnectionProvider, OpenedConnection};

/// Provider wired when no real engine backend is configured.
///
/// Every open fails with [`EngineError::NotConfigured`], so lifecycle
/// operations surface a clear error instead of hanging. The daemon logs a
/// startup warning when this provider is in use.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubProvider;

#[async_trait]
impl ConnectionProvider for StubProvider {
    async fn open(&self, workspace_dir: &Path) -> Result<OpenedConnection, EngineError> {
        warn!(workspace = %workspace_dir.display(), "open requested but no engine backend is configured");
        Err(EngineError::NotConfigured)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
