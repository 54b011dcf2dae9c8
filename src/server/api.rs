//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`ApiState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Failures map onto the wire error envelope
//! `{ "error": <category>, "message": <text> }` — internals never leak.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cache::ScanKey;
use crate::enrichment::{self, EnrichmentRequest, Recommendations};
use crate::scan;
use crate::zodiac::{self, Element};

use super::{auth, ApiState};

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GoodDatesRequest {
    /// Birth date in `YYYY-MM-DD` format.
    pub birth_date: String,
    /// Year to scan; defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Reduce numbers to a single digit before comparing.
    #[serde(default = "default_true")]
    pub match_on_single_digit: bool,
    /// Attach zodiac sign and recommendations.
    #[serde(default)]
    pub include_zodiac: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZodiacPayload {
    pub name: String,
    pub symbol: String,
    pub element: Element,
    pub date_range: String,
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoodDatesResponse {
    /// Matching dates in ascending calendar order.
    pub dates: Vec<String>,
    pub numerology_number: u64,
    pub number_meaning: String,
    pub total_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zodiac_sign: Option<ZodiacPayload>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<ApiState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "service": &*state.service_name,
            "version": env!("CARGO_PKG_VERSION"),
            "status": "ok",
        })),
    )
        .into_response()
}

/// POST /api/good-dates
pub(super) async fn good_dates(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<GoodDatesRequest>,
) -> Response {
    if let Err(retry) = state.limiter.check(addr.ip()) {
        debug!(client = %addr.ip(), "rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry.secs().to_string())],
            json_error("rate_limited", "too many requests, please retry later"),
        )
            .into_response();
    }

    let year = req.year.unwrap_or_else(|| Local::now().year());
    if year < state.year_min || year > state.year_max {
        return (
            StatusCode::BAD_REQUEST,
            json_error(
                "invalid_input",
                format!(
                    "year {year} out of range ({}-{})",
                    state.year_min, state.year_max
                ),
            ),
        )
            .into_response();
    }

    let key = ScanKey {
        birth_date: req.birth_date.clone(),
        year,
        single_digit: req.match_on_single_digit,
        include_zodiac: req.include_zodiac,
    };
    if let Some(hit) = state.cache.lookup(&key) {
        debug!(birth_date = %req.birth_date, year, "scan cache hit");
        return (StatusCode::OK, Json(hit)).into_response();
    }

    let outcome = match scan::scan_year(&req.birth_date, year, req.match_on_single_digit) {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!(birth_date = %req.birth_date, error = %e, "rejected good-dates request");
            return (StatusCode::BAD_REQUEST, json_error("invalid_input", e)).into_response();
        }
    };

    let zodiac_sign = if req.include_zodiac {
        // The birth date already survived the scan, so the sign lookup
        // cannot fail here.
        match zodiac::sign_for_date(&req.birth_date) {
            Ok(sign) => {
                let enrichment_request = EnrichmentRequest {
                    birth_date: &req.birth_date,
                    life_path: outcome.number,
                    sign,
                    dates: &outcome.dates,
                };
                let recommendations = enrichment::enrich(
                    &state.enrichment,
                    &enrichment_request,
                    state.enrichment_timeout,
                )
                .await;
                Some(ZodiacPayload {
                    name: sign.name.to_string(),
                    symbol: sign.symbol.to_string(),
                    element: sign.element,
                    date_range: sign.date_range.to_string(),
                    recommendations,
                })
            }
            Err(e) => {
                return (StatusCode::BAD_REQUEST, json_error("invalid_input", e)).into_response()
            }
        }
    } else {
        None
    };

    let response = GoodDatesResponse {
        total_matches: outcome.dates.len(),
        dates: outcome.dates,
        numerology_number: outcome.number,
        number_meaning: outcome.meaning,
        zodiac_sign,
    };
    state.cache.store(key, response.clone());

    info!(
        birth_date = %req.birth_date,
        year,
        matches = response.total_matches,
        number = response.numerology_number,
        "scan computed"
    );
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /api/admin/cache-clear
pub(super) async fn cache_clear(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(e) = auth::require_admin(&headers, state.admin_api_key.as_deref()) {
        warn!(error = %e, "rejected cache-clear request");
        return (
            StatusCode::FORBIDDEN,
            json_error("unauthorized", "invalid API key"),
        )
            .into_response();
    }

    let cleared = state.cache.clear_expired();
    info!(cleared, "cache sweep complete");
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "cleared": cleared })),
    )
        .into_response()
}
