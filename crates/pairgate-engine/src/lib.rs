//! # pairgate-engine
//!
//! The boundary to the external messaging-protocol engine.
//!
//! The gateway drives connections but never implements the protocol itself:
//! handshake, encryption, and framing live behind [`ConnectionProvider`] and
//! [`EngineConnection`]. Connections report lifecycle changes through a
//! typed [`EngineEvent`] channel instead of ad-hoc callbacks, so consumers
//! can serialize them with caller-issued operations.
//!
//! [`StubProvider`] stands in when no real engine backend is configured;
//! [`testing`] has scripted fakes for orchestrator and server tests.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod stub;
pub mod testing;
pub mod traits;

pub use errors::EngineError;
pub use events::EngineEvent;
pub use stub::StubProvider;
pub use traits::{CloseOutcome, ConnectionProvider, EngineConnection, OpenedConnection};
