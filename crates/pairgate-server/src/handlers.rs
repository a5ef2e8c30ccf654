//! Route handlers for the pairing control surface.
//!
//! Thin layer over [`pairgate_sessions::Orchestrator`]: validate the body,
//! call the one matching lifecycle operation, translate the outcome to the
//! wire shape. No lifecycle logic lives here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pairgate_core::Identity;
use pairgate_sessions::{ConnectOutcome, PairingOutcome};
use serde::Deserialize;

use crate::responses::{
    ApiError, ConnectBody, ErrorBody, PairingBody, SessionsBody, SimpleBody, StatusBody,
};
use crate::server::AppState;

/// Body carrying just a phone number.
#[derive(Debug, Deserialize)]
pub struct NumberRequest {
    /// Raw phone number; sanitized downstream.
    pub number: Option<String>,
}

/// Body for connect requests.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Raw phone number; sanitized downstream.
    pub number: Option<String>,
    /// Tear down and replace an existing connection.
    #[serde(default)]
    pub force: bool,
}

fn require_number(number: Option<String>) -> Result<String, Response> {
    match number {
        Some(n) if !n.trim().is_empty() => Ok(n),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                success: false,
                error: "number is required".into(),
            }),
        )
            .into_response()),
    }
}

/// POST `/api/pair/generate-code`
pub async fn generate_code(
    State(state): State<AppState>,
    Json(req): Json<NumberRequest>,
) -> Response {
    let number = match require_number(req.number) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    match state.orchestrator.generate_code(&number).await {
        Ok(outcome) => Json(pairing_body(outcome, false)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST `/api/pair/connect`
pub async fn connect(State(state): State<AppState>, Json(req): Json<ConnectRequest>) -> Response {
    let number = match require_number(req.number) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    match state.orchestrator.connect(&number, req.force).await {
        Ok(ConnectOutcome::Initiated { number }) => Json(ConnectBody {
            success: true,
            number: number.into_inner(),
            already_connected: None,
            message: "connection initiated".into(),
        })
        .into_response(),
        Ok(ConnectOutcome::AlreadyConnected { number }) => Json(ConnectBody {
            success: true,
            number: number.into_inner(),
            already_connected: Some(true),
            message: "already connected".into(),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST `/api/pair/force-repair`
pub async fn force_repair(
    State(state): State<AppState>,
    Json(req): Json<NumberRequest>,
) -> Response {
    let number = match require_number(req.number) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    match state.orchestrator.force_repair(&number).await {
        Ok(outcome) => Json(pairing_body(outcome, true)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// GET `/api/pair/status/{number}`
///
/// Never fails: an unknown or malformed number reads as disconnected.
pub async fn status(State(state): State<AppState>, Path(number): Path<String>) -> Response {
    let (number, connected) = match Identity::sanitize(&number) {
        Ok(id) => {
            let connected = state.orchestrator.is_connected(&id);
            (id.into_inner(), connected)
        }
        Err(_) => (String::new(), false),
    };
    let message = if connected {
        "connection is active"
    } else {
        "not connected"
    };
    Json(StatusBody {
        success: true,
        connected,
        number,
        message: message.into(),
    })
    .into_response()
}

/// POST `/api/pair/disconnect`
pub async fn disconnect(
    State(state): State<AppState>,
    Json(req): Json<NumberRequest>,
) -> Response {
    let number = match require_number(req.number) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    match state.orchestrator.disconnect(&number).await {
        Ok(number) => Json(SimpleBody {
            success: true,
            number: number.into_inner(),
            message: "disconnected".into(),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// DELETE `/api/pair/session/{number}`
pub async fn delete_session(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Response {
    match state.orchestrator.delete(&number).await {
        Ok(number) => Json(SimpleBody {
            success: true,
            number: number.into_inner(),
            message: "session deleted".into(),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// GET `/api/pair/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Response {
    match state.orchestrator.list_sessions() {
        Ok(sessions) => Json(SessionsBody {
            success: true,
            count: sessions.len(),
            sessions,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

fn pairing_body(outcome: PairingOutcome, is_force_repair: bool) -> PairingBody {
    let flag = is_force_repair.then_some(true);
    match outcome {
        PairingOutcome::CodeIssued { number, pair_code } => PairingBody {
            success: true,
            number: number.into_inner(),
            pair_code: Some(pair_code),
            message: "enter this code on the handset: Settings > Linked Devices > Link a Device"
                .into(),
            is_force_repair: flag,
        },
        PairingOutcome::RestoringExisting { number } => PairingBody {
            success: true,
            number: number.into_inner(),
            pair_code: None,
            message: "session already exists and is being restored".into(),
            is_force_repair: flag,
        },
    }
}
