//! `GatewayServer` — Axum HTTP server for the pairing control surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use pairgate_sessions::Orchestrator;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ServerConfig;
use crate::handlers;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}

/// The gateway HTTP server.
pub struct GatewayServer {
    config: ServerConfig,
    orchestrator: Arc<Orchestrator>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl GatewayServer {
    /// Create a new server.
    #[must_use]
    pub fn new(config: ServerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            orchestrator: self.orchestrator.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/api/pair/generate-code", post(handlers::generate_code))
            .route("/api/pair/connect", post(handlers::connect))
            .route("/api/pair/force-repair", post(handlers::force_repair))
            .route("/api/pair/status/{number}", get(handlers::status))
            .route("/api/pair/disconnect", post(handlers::disconnect))
            .route("/api/pair/session/{number}", delete(handlers::delete_session))
            .route("/api/pair/sessions", get(handlers::list_sessions))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and start serving in a background task.
    ///
    /// Returns the bound address and the serve task's join handle. The task
    /// drains gracefully when [`Self::shutdown`] is cancelled.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server task failed");
            }
        });

        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let live = state.orchestrator.live_count();
    let sessions = state
        .orchestrator
        .list_sessions()
        .map(|s| s.len())
        .unwrap_or(0);
    Json(health::health_check(state.start_time, live, sessions))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pairgate_core::Identity;
    use pairgate_engine::testing::FakeEngine;
    use pairgate_engine::EngineEvent;
    use pairgate_store::{new_in_memory, run_migrations, ConnectionConfig, SessionStore};
    use tower::ServiceExt;

    struct Harness {
        server: GatewayServer,
        engine: FakeEngine,
        orchestrator: Arc<Orchestrator>,
        _root: tempfile::TempDir,
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
        let server = GatewayServer::new(ServerConfig::default(), orchestrator.clone());
        Harness {
            server,
            engine,
            orchestrator,
            _root: root,
        }
    }

    fn num(s: &str) -> Identity {
        Identity::sanitize(s).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Make "100" live: seed a record, connect, emit Opened.
    async fn make_live(h: &Harness) {
        h.orchestrator
            .store()
            .upsert_credentials(&num("100"), "{}")
            .unwrap();
        h.orchestrator.connect("100", false).await.unwrap();
        h.engine
            .last_connection()
            .unwrap()
            .emit(EngineEvent::Opened)
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let h = harness();
        let resp = h.server.router().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["liveConnections"], 0);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let h = harness();
        let resp = h
            .server
            .router()
            .oneshot(get_req("/nonexistent"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_code_requires_number() {
        let h = harness();
        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/generate-code", "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_returns_pair_code() {
        let h = harness();
        h.engine.set_pair_code("WXYZ-1234");
        let resp = h
            .server
            .router()
            .oneshot(post_json(
                "/api/pair/generate-code",
                r#"{"number": "44 7700 900000"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["number"], "447700900000");
        assert_eq!(json["pairCode"], "WXYZ-1234");
        assert!(json["message"].as_str().unwrap().contains("Linked Devices"));
    }

    #[tokio::test(start_paused = true)]
    async fn generate_code_engine_failure_is_500() {
        let h = harness();
        h.engine.set_fail_open(true);
        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/generate-code", r#"{"number": "100"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_without_record_is_404() {
        let h = harness();
        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/connect", r#"{"number": "999"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("no saved session"));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_reports_already_connected() {
        let h = harness();
        make_live(&h).await;

        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/connect", r#"{"number": "100"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["alreadyConnected"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn force_repair_flags_response() {
        let h = harness();
        make_live(&h).await;

        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/force-repair", r#"{"number": "100"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["isForceRepair"], true);
        assert!(json["pairCode"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_connection_state() {
        let h = harness();
        let resp = h
            .server
            .router()
            .oneshot(get_req("/api/pair/status/100"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["connected"], false);

        make_live(&h).await;
        let resp = h
            .server
            .router()
            .oneshot(get_req("/api/pair/status/100"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["connected"], true);
        assert_eq!(json["number"], "100");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_without_connection_is_404() {
        let h = harness();
        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/disconnect", r#"{"number": "999"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("no active connection found"));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_closes_live_connection() {
        let h = harness();
        make_live(&h).await;

        let resp = h
            .server
            .router()
            .oneshot(post_json("/api/pair/disconnect", r#"{"number": "100"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(h.engine.last_connection().unwrap().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_session_is_idempotent() {
        let h = harness();
        make_live(&h).await;

        for _ in 0..2 {
            let resp = h
                .server
                .router()
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri("/api/pair/session/100")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let json = body_json(resp).await;
            assert_eq!(json["success"], true);
        }
        assert!(h.orchestrator.store().get(&num("100")).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_listing_shape() {
        let h = harness();
        make_live(&h).await;
        h.orchestrator
            .store()
            .upsert_credentials(&num("200"), "{}")
            .unwrap();

        let resp = h
            .server
            .router()
            .oneshot(get_req("/api/pair/sessions"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        let first = &json["sessions"][0];
        assert!(first.get("number").is_some());
        assert!(first.get("sessionId").is_some());
        assert!(first.get("connected").is_some());
        assert!(first.get("createdAt").is_some());
        assert!(first.get("updatedAt").is_some());
    }

    #[tokio::test]
    async fn server_boots_and_responds() {
        let h = harness();
        let (addr, handle) = h.server.listen().await.unwrap();

        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        h.server.shutdown().shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn graceful_shutdown_completes() {
        let h = harness();
        let (_, handle) = h.server.listen().await.unwrap();
        h.server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }
}
