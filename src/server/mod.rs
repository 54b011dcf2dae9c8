//! Axum-based HTTP surface.
//!
//! `run()` drives the server loop; a [`CancellationToken`] is wired to axum's
//! graceful shutdown. All shared state is reference-counted and injected into
//! handlers via [`axum::extract::State`] — nothing lives in module globals.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health              — liveness
//! POST /api/good-dates          — numerology date scan (rate limited)
//! POST /api/admin/cache-clear   — purge expired cache entries (X-API-Key)
//! ```

pub mod api;
pub mod auth;
pub mod rate_limit;
pub mod request_log;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::cache::ScanCache;
use crate::config::Config;
use crate::enrichment::EnrichmentProvider;
use crate::error::AppError;

use rate_limit::RateLimiter;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler. Cheap to clone — all fields are
/// reference-counted.
#[derive(Clone)]
pub struct ApiState {
    pub service_name: Arc<str>,
    pub cache: Arc<ScanCache<api::GoodDatesResponse>>,
    pub limiter: Arc<RateLimiter>,
    pub enrichment: EnrichmentProvider,
    pub enrichment_timeout: Duration,
    /// `None` means the admin endpoint rejects everything.
    pub admin_api_key: Option<Arc<str>>,
    pub year_min: i32,
    pub year_max: i32,
}

impl ApiState {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let enrichment =
            EnrichmentProvider::from_config(&config.enrichment, config.llm_api_key.clone())
                .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            service_name: Arc::from(config.service_name.as_str()),
            cache: Arc::new(ScanCache::new(Duration::from_secs(
                config.cache.ttl_hours * 3600,
            ))),
            limiter: Arc::new(RateLimiter::new(
                config.limits.requests_per_minute,
                Duration::from_secs(config.limits.window_seconds),
            )),
            enrichment,
            enrichment_timeout: Duration::from_secs(config.enrichment.timeout_seconds),
            admin_api_key: config.admin_api_key.as_deref().map(Arc::from),
            year_min: config.limits.year_min,
            year_max: config.limits.year_max,
        })
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: ApiState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/good-dates", post(api::good_dates))
        .route("/api/admin/cache-clear", post(api::cache_clear))
        .layer(middleware::from_fn(request_log::log_requests))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(auth::API_KEY_HEADER),
        ])
        .allow_credentials(true)
}

// ── Server loop ───────────────────────────────────────────────────────────────

pub async fn run(config: &Config, shutdown: CancellationToken) -> Result<(), AppError> {
    let state = ApiState::from_config(config)?;
    let router = build_router(state, &config.server.allowed_origins);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", config.server.bind)))?;

    info!(bind = %config.server.bind, "api server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("api server shut down");
    Ok(())
}
