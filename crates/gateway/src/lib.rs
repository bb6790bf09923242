//! HTTP API gateway for ToneShift.
//!
//! Serves the REST API the mobile client talks to: accounts,
//! conversations, relationship profiles, the tone catalog and the
//! tone-shifted response endpoints. Everything under `/api` except
//! register and login requires an `Authorization: Bearer <token>` header.
//!
//! Built on Axum.

pub mod api;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use toneshift_config::{AppConfig, GatewayConfig, StorageConfig};
use toneshift_core::{Store, StoreError};
use toneshift_engine::{Credentials, ServiceSettings, ToneService};
use toneshift_providers::OllamaGenerator;
use toneshift_store::{InMemoryStore, SqliteStore};

pub use error::ApiError;

/// Maximum number of live sessions before the oldest are evicted.
const MAX_SESSIONS: usize = 10_000;

// ── Sessions ──────────────────────────────────────────────────────────────

/// Opaque bearer tokens mapped to user ids, held in memory.
pub struct Sessions {
    inner: RwLock<SessionTable>,
    capacity: usize,
}

#[derive(Default)]
struct SessionTable {
    by_token: HashMap<String, String>,
    order: VecDeque<String>,
}

impl Sessions {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(SessionTable::default()),
            capacity: capacity.max(1),
        }
    }

    /// Issue a fresh token for `user_id`, evicting the oldest when full.
    pub async fn issue(&self, user_id: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut table = self.inner.write().await;
        while table.order.len() >= self.capacity {
            if let Some(oldest) = table.order.pop_front() {
                table.by_token.remove(&oldest);
            }
        }
        table.order.push_back(token.clone());
        table.by_token.insert(token.clone(), user_id.to_string());
        token
    }

    pub async fn user_for(&self, token: &str) -> Option<String> {
        self.inner.read().await.by_token.get(token).cloned()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.by_token.len()
    }
}

// ── State ─────────────────────────────────────────────────────────────────

/// Shared application state for the gateway.
pub struct GatewayState {
    pub service: ToneService,
    pub credentials: Credentials,
    pub sessions: Sessions,
}

impl GatewayState {
    pub fn new(service: ToneService, credentials: Credentials) -> Self {
        Self {
            service,
            credentials,
            sessions: Sessions::new(MAX_SESSIONS),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.service.store().as_ref()
    }
}

pub type SharedState = Arc<GatewayState>;

/// The authenticated caller, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

// ── Router ────────────────────────────────────────────────────────────────

/// Build the full router.
///
/// Layers applied:
/// - Bearer session authentication on protected `/api` routes
/// - CORS (permissive unless origins are configured)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let protected = api::protected_router()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
    let api = api::public_router().merge(protected).with_state(state);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Open the configured storage backend.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend.as_str() {
        "memory" => {
            warn!("Using in-memory storage, data is lost on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
        _ => {
            if let Some(parent) = std::path::Path::new(&config.path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Storage(format!("Cannot create {}: {e}", parent.display()))
                })?;
            }
            Ok(Arc::new(SqliteStore::new(&config.path).await?))
        }
    }
}

/// Build the service stack from configuration.
pub async fn build_state(config: &AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let store = open_store(&config.storage).await?;
    let seeded = toneshift_engine::seed_system_tones(&*store).await?;
    if seeded > 0 {
        info!(count = seeded, "Seeded system tones");
    }

    let generator = Arc::new(OllamaGenerator::from_config(&config.generation)?);
    let service = ToneService::new(store, generator, ServiceSettings::from_config(config));
    Ok(Arc::new(GatewayState::new(service, Credentials::default())))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config).await?;
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        model = %config.generation.model,
        storage = %config.storage.backend,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for protected `/api` routes.
///
/// Requires `Authorization: Bearer <token>` naming a live session.
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let user_id = match token {
        Some(token) if !token.is_empty() => state.sessions.user_for(token).await,
        _ => None,
    };

    match user_id {
        Some(user_id) => {
            req.extensions_mut().insert(CurrentUser(user_id));
            next.run(req).await
        }
        None => {
            warn!(path = %req.uri().path(), "Unauthorized request, missing or invalid bearer token");
            ApiError(toneshift_core::Error::Unauthorized("Authentication required".into())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        api::tests::test_state(Arc::new(api::tests::MockGenerator::ok()))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/api/conversations")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/api/tones")
            .header("Authorization", "Bearer not-a-session")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sessions_evict_oldest() {
        let sessions = Sessions::new(2);
        let first = sessions.issue("u1").await;
        let second = sessions.issue("u2").await;
        let third = sessions.issue("u3").await;

        assert_eq!(sessions.count().await, 2);
        assert!(sessions.user_for(&first).await.is_none());
        assert_eq!(sessions.user_for(&second).await.as_deref(), Some("u2"));
        assert_eq!(sessions.user_for(&third).await.as_deref(), Some("u3"));
    }

    #[test]
    fn cors_ignores_bad_origins() {
        // Must not panic on an unparsable origin
        let _ = cors_layer(&["http://localhost:19006".into(), "bad\norigin".into()]);
    }
}
