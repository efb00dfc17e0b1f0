//! HTTP interface for the agent.
//!
//! Routes:
//!
//! - `GET /.well-known/agent.json` returns the agent card.
//! - `POST /` runs an entrypoint and returns every message once it finishes.
//! - `POST /stream` runs an entrypoint and forwards messages as Server-Sent
//!   Events while it works.
//! - `GET /health` reports liveness.

mod error;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ApiResult};

use crate::agent::{AgentCard, IDigBioAgent, AGENT_NAME};
use crate::config::Config;
use crate::entrypoints::Entrypoint;
use crate::error::{Error, Result};
use crate::response::{AgentMessage, ResponseContext};

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    agent: Arc<IDigBioAgent>,
    response_buffer: usize,
}

impl AppState {
    /// Wrap an agent; each response channel holds up to `response_buffer`
    /// messages.
    #[must_use]
    pub fn new(agent: IDigBioAgent, response_buffer: usize) -> Self {
        Self {
            agent: Arc::new(agent),
            response_buffer,
        }
    }
}

/// Body of `POST /` and `POST /stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Natural-language request.
    pub request: String,
    /// Entrypoint id.
    pub entrypoint: String,
    /// Structured parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Body returned by `POST /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Messages in the order they were produced.
    pub messages: Vec<AgentMessage>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/.well-known/agent.json", get(agent_card))
        .route("/", post(run_request))
        .route("/stream", post(stream_request))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `agent` on the configured address until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid, cannot be bound, or the
/// server fails while running.
pub async fn serve(config: &Config, agent: IDigBioAgent) -> Result<()> {
    let bind = config.bind_address();
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| Error::config_validation(format!("invalid bind address '{bind}'")))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    let app = router(AppState::new(agent, config.server.response_buffer));
    info!(%addr, "agent listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.agent.card())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": AGENT_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "translator": state.agent.translator().name(),
    }))
}

async fn run_request(
    State(state): State<AppState>,
    Json(body): Json<AgentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let entrypoint: Entrypoint = body.entrypoint.parse()?;
    let (context, mut rx) = ResponseContext::channel(state.response_buffer);

    let agent = Arc::clone(&state.agent);
    let task = tokio::spawn(async move {
        agent
            .run(&context, &body.request, entrypoint.id(), body.params.as_ref())
            .await
    });

    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    task.await??;

    Ok(Json(AgentResponse { messages }))
}

async fn stream_request(
    State(state): State<AppState>,
    Json(body): Json<AgentRequest>,
) -> ApiResult<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let entrypoint: Entrypoint = body.entrypoint.parse()?;
    let (context, rx) = ResponseContext::channel(state.response_buffer);

    let agent = Arc::clone(&state.agent);
    tokio::spawn(async move {
        if let Err(err) = agent
            .run(&context, &body.request, entrypoint.id(), body.params.as_ref())
            .await
        {
            warn!(error = %err, %entrypoint, "streamed run ended early");
        }
    });

    let stream = ReceiverStream::new(rx).map(|message| Ok(message_event(&message)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

fn message_event(message: &AgentMessage) -> Event {
    let data = serde_json::to_string(message).unwrap_or_else(|err| {
        warn!(error = %err, "failed to encode message");
        "{}".to_string()
    });
    Event::default().event(message.event_name()).data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entrypoints::testing::FakeIDigBio;
    use crate::idigbio::ApiResponse;
    use crate::translate::RuleTranslator;
    use crate::urls::IDigBioUrls;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let agent = IDigBioAgent::new(
            Arc::new(RuleTranslator::new()),
            Arc::new(FakeIDigBio::new(ApiResponse::success(json!({
                "itemCount": 3,
                "items": [{"uuid": "a"}, {"uuid": "b"}, {"uuid": "c"}]
            })))),
            IDigBioUrls::default(),
        );
        router(AppState::new(agent, 8))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_agent_card_route() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/agent.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let card = body_json(response).await;
        assert_eq!(card["name"], "iDigBio Search");
        assert_eq!(card["entrypoints"].as_array().unwrap().len(), 3);
        assert_eq!(card["entrypoints"][1]["id"], "find_media_records");
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["translator"], "rules");
    }

    #[tokio::test]
    async fn test_run_request_collects_messages() {
        let response = app()
            .oneshot(post_json(
                "/",
                &json!({"request": "Homo sapiens", "entrypoint": "find_occurrence_records"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(
            messages[0],
            json!({"type": "process_start", "summary": "Searching iDigBio occurrence records"})
        );
        assert!(messages.iter().any(|message| message["type"] == "artifact"));
    }

    #[tokio::test]
    async fn test_run_request_unknown_entrypoint() {
        let response = app()
            .oneshot(post_json(
                "/",
                &json!({"request": "Homo sapiens", "entrypoint": "find_fossils"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({"error": {"message": "unknown entrypoint 'find_fossils'", "status": 400}})
        );
    }

    #[tokio::test]
    async fn test_stream_request_sends_events() {
        let response = app()
            .oneshot(post_json(
                "/stream",
                &json!({"request": "Audio of homo sapiens", "entrypoint": "find_media_records"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("event: process_start\n"));
        assert!(text.contains("event: process_log\n"));
        assert!(text.contains("event: artifact\n"));
        assert!(text.contains("event: reply\n"));
    }

    #[tokio::test]
    async fn test_stream_request_unknown_entrypoint() {
        let response = app()
            .oneshot(post_json(
                "/stream",
                &json!({"request": "Homo sapiens", "entrypoint": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
