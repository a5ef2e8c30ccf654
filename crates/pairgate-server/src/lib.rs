//! # pairgate-server
//!
//! Axum HTTP control surface for the gateway.
//!
//! - Pairing routes under `/api/pair/*` (generate-code, connect,
//!   force-repair, status, disconnect, session deletion, listing)
//! - `/health` with uptime and connection counters
//! - Graceful shutdown via `CancellationToken`
//!
//! Handlers are a thin validation/translation layer; all lifecycle
//! decisions live in `pairgate-sessions`.

#![deny(unsafe_code)]

pub mod config;
pub mod handlers;
pub mod health;
pub mod responses;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use server::{AppState, GatewayServer};
pub use shutdown::ShutdownCoordinator;
