//! Wire-format response types and error mapping.
//!
//! Bodies are camelCase JSON. Failures are always
//! `{"success": false, "error": "..."}` with the status code carrying the
//! taxonomy: 400 validation, 404 missing record/connection, 409 busy or
//! conflicting attempt, 500 engine/store failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pairgate_sessions::{LifecycleError, SessionInfo};
use serde::Serialize;

/// Failure body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always false.
    pub success: bool,
    /// Human-readable error message.
    pub error: String,
}

/// Success body for generate-code and force-repair.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingBody {
    /// Always true.
    pub success: bool,
    /// Normalized number.
    pub number: String,
    /// One-time pairing code, absent when an existing registration is being
    /// restored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_code: Option<String>,
    /// Human-readable status message.
    pub message: String,
    /// Present (true) on force-repair responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_force_repair: Option<bool>,
}

/// Success body for connect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectBody {
    /// Always true.
    pub success: bool,
    /// Normalized number.
    pub number: String,
    /// Present (true) when a live connection already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_connected: Option<bool>,
    /// Human-readable status message.
    pub message: String,
}

/// Body for status queries.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    /// Always true — status never fails.
    pub success: bool,
    /// Whether a live connection exists.
    pub connected: bool,
    /// Normalized number.
    pub number: String,
    /// Human-readable status message.
    pub message: String,
}

/// Success body for disconnect and delete.
#[derive(Debug, Serialize)]
pub struct SimpleBody {
    /// Always true.
    pub success: bool,
    /// Normalized number.
    pub number: String,
    /// Human-readable status message.
    pub message: String,
}

/// Success body for the session listing.
#[derive(Debug, Serialize)]
pub struct SessionsBody {
    /// Always true.
    pub success: bool,
    /// Number of sessions returned.
    pub count: usize,
    /// Active sessions with their live-connection flag.
    pub sessions: Vec<SessionInfo>,
}

/// Lifecycle error wrapper implementing the wire mapping.
#[derive(Debug)]
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LifecycleError::InvalidNumber(_) => StatusCode::BAD_REQUEST,
            LifecycleError::NoSavedSession(_) | LifecycleError::NotConnected(_) => {
                StatusCode::NOT_FOUND
            }
            LifecycleError::Busy(_) | LifecycleError::Conflict(_) => StatusCode::CONFLICT,
            LifecycleError::Engine(_)
            | LifecycleError::Store(_)
            | LifecycleError::Workspace(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
