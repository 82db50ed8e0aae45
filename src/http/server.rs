//! HTTP server setup and request handlers.
//!
//! # Responsibilities
//! - Create the Axum router (JSON-RPC, intents, health, admin)
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Dispatch gated calls to the decision pipeline, relay everything else
//! - Apply hot-reloaded configuration

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::SentinelConfig;
use crate::gate::{unix_now, Decision, GateContext, GateError, GateInitError};
use crate::http::request::{request_id, IntentRequest, RpcRequest, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{passthrough, plain_error, rejection, rpc_result, RpcFailure};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<GateContext>,
    /// Bearer token for the admin router.
    pub admin_key: Arc<str>,
}

/// HTTP server for the transaction gate.
pub struct HttpServer {
    router: Router,
    gate: Arc<GateContext>,
    config: SentinelConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: SentinelConfig) -> Result<Self, GateInitError> {
        let gate = Arc::new(GateContext::from_config(&config)?);
        let state = AppState {
            gate: gate.clone(),
            admin_key: Arc::from(config.admin.api_key.as_str()),
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, gate, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &SentinelConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", post(rpc_handler))
            .route("/intents", post(intents_handler))
            .route("/health", get(health_handler));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<axum::body::Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                path = %request.uri().path(),
                                request_id = %request_id(request),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Shared gate state, for callers that run alongside the server.
    pub fn gate(&self) -> Arc<GateContext> {
        self.gate.clone()
    }

    /// Run the server until `shutdown` fires, applying reloaded
    /// configurations from `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<SentinelConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            gated_method = %self.gate.policy().method,
            "HTTP server starting"
        );

        tokio::spawn(apply_config_updates(
            self.gate.clone(),
            self.config.clone(),
            config_updates,
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }
}

/// Swap the gate policy on reload; other sections are read once at startup.
async fn apply_config_updates(
    gate: Arc<GateContext>,
    mut current: SentinelConfig,
    mut updates: mpsc::UnboundedReceiver<SentinelConfig>,
) {
    while let Some(next) = updates.recv().await {
        if next.gate != current.gate {
            gate.update_policy(next.gate.clone());
        }

        let restart_needed = [
            ("listener", next.listener != current.listener),
            ("upstream", next.upstream != current.upstream),
            ("risk", next.risk != current.risk),
            ("intents", next.intents != current.intents),
            ("timeouts", next.timeouts != current.timeouts),
            ("security", next.security != current.security),
            ("observability", next.observability != current.observability),
            ("admin", next.admin != current.admin),
        ];
        for (section, _) in restart_needed.iter().filter(|(_, changed)| *changed) {
            tracing::warn!(section = *section, "Config section changed; restart to apply");
        }

        current = next;
    }
}

/// JSON-RPC endpoint. Gated calls go through the decision pipeline, all other
/// methods are relayed to the upstream node.
async fn rpc_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<RpcRequest>,
) -> Response {
    let start = Instant::now();
    let now = unix_now();
    state.gate.sweep_intents(now);

    if !state.gate.is_gated(&request.method) {
        tracing::debug!(method = %request.method, "Forwarding request");
        let response = match state.gate.forward(&request.method, &request.params, &request.id).await {
            Ok(reply) => passthrough(reply),
            Err(error) => RpcFailure::forward(request.id, error).into_response(),
        };
        metrics::record_request("forwarded", start);
        return response;
    }

    tracing::debug!(method = %request.method, client = %peer.ip(), "Gating request");
    let response = match state.gate.submit(&request.params, peer.ip(), now).await {
        Ok(Decision::Released(tx_id)) => rpc_result(&request.id, json!(tx_id)),
        Ok(Decision::Rejected(verdict)) => rejection(&request.id, &verdict),
        Err(error) => RpcFailure::gate(request.id, error).into_response(),
    };
    metrics::record_request("gated", start);
    response
}

/// Records the user's stated purpose for their next transaction.
async fn intents_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(body): Json<IntentRequest>,
) -> Response {
    let start = Instant::now();
    let now = unix_now();
    state.gate.sweep_intents(now);

    let response = match state.gate.set_intent(peer.ip(), body.intent.as_deref(), now) {
        Ok(()) => {
            tracing::info!(client = %peer.ip(), "Intent recorded");
            Json(json!({"status": "ok"})).into_response()
        }
        Err(GateError::Validation(message)) => plain_error(StatusCode::BAD_REQUEST, &message),
        Err(error) => {
            tracing::error!(error = %error, "Failed to record intent");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Error recording intent.")
        }
    };
    metrics::record_request("intent", start);
    response
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "pending": state.gate.pending().len(),
        "intents": state.gate.intents().len(),
    }))
}
