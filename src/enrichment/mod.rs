//! Zodiac/lifestyle enrichment boundary.
//!
//! `EnrichmentProvider` is an enum over concrete backends, mirroring how the
//! rest of the crate avoids trait objects. The AI-backed provider returns
//! best-effort parsed prose; the rule-based provider is deterministic and is
//! also the fallback whenever the collaborator fails, times out, or returns
//! nothing usable — a request never fails because of enrichment.

pub mod providers;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::EnrichmentConfig;
use crate::zodiac::ZodiacSign;

/// Maximum day gap between consecutive dates of one power period.
pub const POWER_PERIOD_MAX_GAP_DAYS: i64 = 3;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown enrichment provider: {0}")]
    UnknownProvider(String),
    #[error("enrichment request failed: {0}")]
    Request(String),
    #[error("enrichment response unusable: {0}")]
    Unparseable(String),
}

// ── Typed recommendation model ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Career,
    Personal,
    Rest,
    Financial,
}

/// Advice attached to one matched date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateAdvice {
    pub activities: Vec<String>,
    /// Coarse time-of-day label ("morning", "evening", …) when one was found.
    pub timing: Option<String>,
    pub power_level: u8,
    pub category: Category,
}

/// A maximal run of high-power dates whose consecutive gap stays within
/// [`POWER_PERIOD_MAX_GAP_DAYS`]. Runs of length 1 are not periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPeriod {
    pub start_date: String,
    pub end_date: String,
    pub dates: Vec<String>,
    pub duration: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recommendations {
    pub career: Vec<String>,
    pub personal: Vec<String>,
    pub rest: Vec<String>,
    pub financial: Vec<String>,
    pub power_periods: Vec<PowerPeriod>,
    pub date_specific_advice: BTreeMap<String, DateAdvice>,
}

impl Recommendations {
    /// True when no bucket carries anything worth returning.
    pub fn is_vacant(&self) -> bool {
        self.career.is_empty()
            && self.personal.is_empty()
            && self.rest.is_empty()
            && self.financial.is_empty()
            && self.date_specific_advice.is_empty()
    }
}

/// Everything the core exposes to the enrichment collaborator.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentRequest<'a> {
    pub birth_date: &'a str,
    pub life_path: u64,
    pub sign: &'static ZodiacSign,
    pub dates: &'a [String],
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available enrichment backends.
///
/// Adding a backend = new module under `providers/` + new variant + new
/// `recommend` arm.
#[derive(Debug, Clone)]
pub enum EnrichmentProvider {
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    RuleBased(providers::rule_based::RuleBasedProvider),
}

impl EnrichmentProvider {
    /// Build the configured backend. `api_key` is `None` for keyless local
    /// endpoints and ignored by the rule-based provider.
    pub fn from_config(
        cfg: &EnrichmentConfig,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        match cfg.provider.as_str() {
            "rule_based" => Ok(Self::RuleBased(providers::rule_based::RuleBasedProvider)),
            "openai" => Ok(Self::OpenAiCompatible(
                providers::openai_compatible::OpenAiCompatibleProvider::new(
                    cfg.openai.api_base_url.clone(),
                    cfg.openai.model.clone(),
                    cfg.openai.temperature,
                    cfg.openai.max_tokens,
                    cfg.timeout_seconds,
                    api_key,
                )?,
            )),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }

    pub async fn recommend(
        &self,
        req: &EnrichmentRequest<'_>,
    ) -> Result<Recommendations, ProviderError> {
        match self {
            Self::OpenAiCompatible(p) => p.recommend(req).await,
            Self::RuleBased(p) => Ok(p.recommend(req)),
        }
    }
}

/// Run the provider under `timeout` and substitute the deterministic fallback
/// on failure, timeout, or vacant output. Infallible by construction.
pub async fn enrich(
    provider: &EnrichmentProvider,
    req: &EnrichmentRequest<'_>,
    timeout: Duration,
) -> Recommendations {
    match tokio::time::timeout(timeout, provider.recommend(req)).await {
        Ok(Ok(recs)) if !recs.is_vacant() => recs,
        Ok(Ok(_)) => {
            warn!(sign = %req.sign.name, "enrichment provider returned nothing usable, using fallback");
            providers::rule_based::RuleBasedProvider.recommend(req)
        }
        Ok(Err(e)) => {
            warn!(sign = %req.sign.name, error = %e, "enrichment provider failed, using fallback");
            providers::rule_based::RuleBasedProvider.recommend(req)
        }
        Err(_) => {
            warn!(sign = %req.sign.name, "enrichment provider timed out, using fallback");
            providers::rule_based::RuleBasedProvider.recommend(req)
        }
    }
}

// ── Power-period clustering ───────────────────────────────────────────────────

/// Group `dates` into maximal runs whose consecutive gap is at most
/// `max_gap_days`. Input order is irrelevant; unparseable dates are skipped.
pub fn power_periods(dates: &[String], max_gap_days: i64) -> Vec<PowerPeriod> {
    let mut parsed: Vec<(NaiveDate, &String)> = dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok().map(|p| (p, d)))
        .collect();
    parsed.sort();

    let mut periods = Vec::new();
    let mut run: Vec<(NaiveDate, &String)> = Vec::new();

    let flush = |run: &mut Vec<(NaiveDate, &String)>, periods: &mut Vec<PowerPeriod>| {
        if run.len() > 1 {
            periods.push(PowerPeriod {
                start_date: run[0].1.clone(),
                end_date: run[run.len() - 1].1.clone(),
                dates: run.iter().map(|(_, s)| (*s).clone()).collect(),
                duration: run.len(),
            });
        }
        run.clear();
    };

    for (date, raw) in parsed {
        match run.last() {
            Some((prev, _)) if (date - *prev).num_days() <= max_gap_days => {
                run.push((date, raw));
            }
            Some(_) => {
                flush(&mut run, &mut periods);
                run.push((date, raw));
            }
            None => run.push((date, raw)),
        }
    }
    flush(&mut run, &mut periods);

    periods
}
