//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the `-f` path), then applies
//! `NEKATHA_BIND` and `NEKATHA_LOG_LEVEL` overrides. Secrets are only ever
//! read from the environment: `NEKATHA_ADMIN_KEY` for the admin endpoint and
//! `LLM_API_KEY` for the enrichment provider — never from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the listener binds to.
    pub bind: String,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

/// Request-validation and rate-limit policy knobs.
///
/// These are policy constants, not domain invariants — tune freely.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub requests_per_minute: u32,
    pub window_seconds: u64,
    pub year_min: i32,
    pub year_max: i32,
}

/// Scan-result cache policy.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_hours: u64,
}

/// OpenAI / OpenAI-compatible endpoint configuration (`[enrichment.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Enrichment subsystem configuration.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Which backend is active (`"rule_based"` or `"openai"`).
    pub provider: String,
    /// Upper bound on one collaborator round-trip; past it the rule-based
    /// fallback answers instead.
    pub timeout_seconds: u64,
    pub openai: OpenAiConfig,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub log_level: String,
    /// Optional log file (already `~`-expanded); stderr when absent.
    pub log_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
    pub enrichment: EnrichmentConfig,
    /// Admin key from `NEKATHA_ADMIN_KEY` — `None` means the admin endpoint
    /// rejects everything.
    pub admin_api_key: Option<String>,
    /// API key from `LLM_API_KEY` — `None` for keyless local models.
    pub llm_api_key: Option<String>,
}

// ── Raw TOML shape — serde target before resolution ───────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    limits: RawLimits,
    #[serde(default)]
    cache: RawCache,
    #[serde(default)]
    enrichment: RawEnrichment,
}

#[derive(Deserialize)]
struct RawService {
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default)]
    allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
struct RawLimits {
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: u32,
    #[serde(default = "default_window_seconds")]
    window_seconds: u64,
    #[serde(default = "default_year_min")]
    year_min: i32,
    #[serde(default = "default_year_max")]
    year_max: i32,
}

#[derive(Deserialize)]
struct RawCache {
    #[serde(default = "default_ttl_hours")]
    ttl_hours: u64,
}

#[derive(Deserialize)]
struct RawEnrichment {
    #[serde(default = "default_enrichment_provider")]
    provider: String,
    #[serde(default = "default_enrichment_timeout")]
    timeout_seconds: u64,
    #[serde(default)]
    openai: RawOpenAi,
}

#[derive(Deserialize)]
struct RawOpenAi {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_max_tokens")]
    max_tokens: u32,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for RawLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            window_seconds: default_window_seconds(),
            year_min: default_year_min(),
            year_max: default_year_max(),
        }
    }
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl Default for RawEnrichment {
    fn default() -> Self {
        Self {
            provider: default_enrichment_provider(),
            timeout_seconds: default_enrichment_timeout(),
            openai: RawOpenAi::default(),
        }
    }
}

impl Default for RawOpenAi {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_window_seconds() -> u64 {
    60
}
fn default_year_min() -> i32 {
    1900
}
fn default_year_max() -> i32 {
    2100
}
fn default_ttl_hours() -> u64 {
    24
}
fn default_enrichment_provider() -> String {
    "rule_based".to_string()
}
fn default_enrichment_timeout() -> u64 {
    20
}
fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_temperature() -> f32 {
    0.7
}
fn default_openai_max_tokens() -> u32 {
    400
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let bind_override = env::var("NEKATHA_BIND").ok();
    let log_level_override = env::var("NEKATHA_LOG_LEVEL").ok();
    load_from(
        Path::new(path.unwrap_or("config/default.toml")),
        bind_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if parsed.limits.year_min > parsed.limits.year_max {
        return Err(AppError::Config(format!(
            "year_min {} exceeds year_max {}",
            parsed.limits.year_min, parsed.limits.year_max
        )));
    }

    Ok(Config {
        service_name: parsed.service.name,
        log_level: log_level_override
            .unwrap_or(&parsed.service.log_level)
            .to_string(),
        log_file: parsed.service.log_file.as_deref().map(expand_home),
        server: ServerConfig {
            bind: bind_override.unwrap_or(&parsed.server.bind).to_string(),
            allowed_origins: parsed.server.allowed_origins,
        },
        limits: LimitsConfig {
            requests_per_minute: parsed.limits.requests_per_minute,
            window_seconds: parsed.limits.window_seconds,
            year_min: parsed.limits.year_min,
            year_max: parsed.limits.year_max,
        },
        cache: CacheConfig {
            ttl_hours: parsed.cache.ttl_hours,
        },
        enrichment: EnrichmentConfig {
            provider: parsed.enrichment.provider,
            timeout_seconds: parsed.enrichment.timeout_seconds,
            openai: OpenAiConfig {
                api_base_url: parsed.enrichment.openai.api_base_url,
                model: parsed.enrichment.openai.model,
                temperature: parsed.enrichment.openai.temperature,
                max_tokens: parsed.enrichment.openai.max_tokens,
            },
        },
        admin_api_key: env::var("NEKATHA_ADMIN_KEY").ok(),
        llm_api_key: env::var("LLM_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — rule-based enrichment, no keys, no network.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            service_name: "test".into(),
            log_level: "info".into(),
            log_file: None,
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                allowed_origins: Vec::new(),
            },
            limits: LimitsConfig {
                requests_per_minute: 60,
                window_seconds: 60,
                year_min: 1900,
                year_max: 2100,
            },
            cache: CacheConfig { ttl_hours: 24 },
            enrichment: EnrichmentConfig {
                provider: "rule_based".into(),
                timeout_seconds: 1,
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    max_tokens: 64,
                },
            },
            admin_api_key: None,
            llm_api_key: None,
        }
    }
}
