//! API Router and Application State

mod extract;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{self, ErrorEnvelope, SessionStore};
use crate::config::Config;
use crate::db::{KeyValueStore, RecordStore};

pub use extract::{trimmed, ValidatedJson};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Principal, role and permission records
    pub records: Arc<dyn RecordStore>,
    /// Login sessions
    pub sessions: SessionStore,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>, kv: Arc<dyn KeyValueStore>, config: Config) -> Self {
        let sessions = SessionStore::new(kv, config.token_validity.clone());
        Self {
            records,
            sessions,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes (pass state for middleware)
        .nest("/v1/admin/auth", auth::admin_router(state.clone()))
        .nest("/v1/auth", auth::user_router(state.clone()))
        .fallback(route_not_found)
        // Middleware
        .layer(from_fn_with_state(state.clone(), stamp_service_name))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // State
        .with_state(state)
}

/// Add the configured service name to error envelopes that lack one.
async fn stamp_service_name(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(service) = state.config.service_name.as_deref() else {
        return response;
    };
    match response.extensions().get::<ErrorEnvelope>() {
        Some(envelope) if envelope.service.is_none() => envelope
            .clone()
            .with_service(Some(service))
            .into_response_with(response.status()),
        _ => response,
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.config.service_name.clone(),
    })
}

async fn route_not_found(State(state): State<AppState>) -> Response {
    ErrorEnvelope::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
        .with_service(state.config.service_name.as_deref())
        .into_response_with(StatusCode::NOT_FOUND)
}
