//! Local HTTP surface of the execution agent
//!
//! `POST /droneCommand` takes any action request, `POST /executeCode`
//! takes `{"code": ...}`, `GET /health` answers `{"status": "ok"}`.
//! Each request spawns independently and is answered as soon as the child
//! is running.

use crate::agent::runner::ScriptRunner;
use crate::command::request::{ActionRequest, AgentReply, CodePayload};
use crate::core::config::AgentConfig;
use crate::core::error::{BridgeError, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Shared state for axum handlers.
#[derive(Clone)]
struct AgentState {
    runner: Arc<ScriptRunner>,
}

type Reply = (StatusCode, Json<AgentReply>);

/// Build the agent router around a runner
pub fn build_router(runner: Arc<ScriptRunner>) -> Router {
    Router::new()
        .route("/droneCommand", post(handle_drone_command))
        .route("/executeCode", post(handle_execute_code))
        .route("/health", get(handle_health))
        .with_state(AgentState { runner })
}

/// Running execution agent
pub struct AgentServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl AgentServer {
    /// Bind to `{config.host}:{config.port}` and serve in a background task
    ///
    /// Port `0` picks a free port.
    pub async fn start(runner: Arc<ScriptRunner>, config: &AgentConfig) -> Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            BridgeError::Config(format!("agent bind to {} failed: {}", bind_addr, e))
        })?;
        let addr = listener.local_addr()?;

        tracing::info!("execution agent listening on http://{}", addr);

        let app = build_router(runner);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("execution agent error: {}", e);
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting requests; spawned processes keep running
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for AgentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_drone_command(
    State(state): State<AgentState>,
    payload: std::result::Result<Json<ActionRequest>, JsonRejection>,
) -> Reply {
    match payload {
        Ok(Json(request)) => execute(&state, &request).await,
        Err(rejection) => bad_request(rejection),
    }
}

async fn handle_execute_code(
    State(state): State<AgentState>,
    payload: std::result::Result<Json<CodePayload>, JsonRejection>,
) -> Reply {
    match payload {
        Ok(Json(CodePayload { code })) => {
            execute(&state, &ActionRequest::ExecuteCode { code }).await
        }
        Err(rejection) => bad_request(rejection),
    }
}

async fn handle_health() -> Json<AgentReply> {
    Json(AgentReply::ok())
}

async fn execute(state: &AgentState, request: &ActionRequest) -> Reply {
    match state.runner.execute(request).await {
        Ok(run) => {
            tracing::debug!(action = request.action_name(), pid = run.pid(), "action accepted");
            (StatusCode::OK, Json(AgentReply::ok()))
        }
        Err(e) => {
            tracing::warn!(action = request.action_name(), "action failed: {}", e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(AgentReply::error(e.to_string())))
        }
    }
}

fn bad_request(rejection: JsonRejection) -> Reply {
    tracing::warn!("rejected request: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(AgentReply::error(rejection.body_text())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_on_ephemeral_port() {
        let config = AgentConfig {
            port: 0,
            ..AgentConfig::default()
        };
        let server = AgentServer::start(Arc::new(ScriptRunner::new(&config)), &config)
            .await
            .unwrap();
        assert_ne!(server.port(), 0);
        assert!(server.addr().ip().is_loopback());
        server.shutdown();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_config_error() {
        let config = AgentConfig {
            port: 0,
            ..AgentConfig::default()
        };
        let runner = Arc::new(ScriptRunner::new(&config));
        let first = AgentServer::start(runner.clone(), &config).await.unwrap();

        let taken = AgentConfig {
            port: first.port(),
            ..AgentConfig::default()
        };
        let second = AgentServer::start(runner, &taken).await;
        assert!(matches!(second, Err(BridgeError::Config(_))));
    }
}
