//! # pairgate-settings
//!
//! Configuration management with layered sources for the pairgate gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`GatewaySettings::default()`]
//! 2. **User file** — `~/.pairgate/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `PAIRGATE_*` overrides (highest priority)
//!
//! The durable-store path lives here (or in the environment) and nowhere
//! else; source code never carries a connection string.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
