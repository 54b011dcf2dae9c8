//! OpenAI-compatible chat completion backend (`/v1/chat/completions`).
//!
//! Sends the astrologer prompt and segments the returned prose into the typed
//! recommendation model with keyword heuristics. All wire types are private
//! to this module — callers only ever see [`Recommendations`]. The parse is
//! best-effort: anything that yields no usable content is an error, and the
//! caller substitutes the rule-based fallback.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::enrichment::{
    power_periods, Category, DateAdvice, EnrichmentRequest, ProviderError, Recommendations,
    POWER_PERIOD_MAX_GAP_DAYS,
};

/// How many matched dates the prompt enumerates.
const PROMPT_DATE_LIMIT: usize = 8;

/// Bullet lines shorter than this are treated as noise, not advice.
const MIN_ADVICE_LEN: usize = 20;

const TIME_LABELS: [&str; 7] = [
    "morning", "afternoon", "evening", "night", "noon", "dawn", "dusk",
];

const POWER_WORDS: [&str; 5] = ["powerful", "optimal", "perfect", "ideal", "strongest"];

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions` —
/// OpenAI itself or compatible local servers. Constructed once at startup,
/// then cheaply cloned because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url,
            model,
            temperature,
            max_tokens,
            api_key,
        })
    }

    /// One round-trip: prompt out, parsed recommendations back.
    pub async fn recommend(
        &self,
        req: &EnrichmentRequest<'_>,
    ) -> Result<Recommendations, ProviderError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_prompt(req),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        debug!(
            model = %payload.model,
            dates = req.dates.len(),
            sign = %req.sign.name,
            "sending enrichment request"
        );

        let mut http_req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "enrichment HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize enrichment response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Unparseable("empty or missing content".into()))?;

        trace!(chars = text.len(), "received enrichment prose");

        let recs = parse_prose(&text, req.dates);
        if recs.is_vacant() {
            return Err(ProviderError::Unparseable(
                "no recognizable sections in response".into(),
            ));
        }
        Ok(recs)
    }
}

const SYSTEM_PROMPT: &str = "You are an elite astrologer and numerologist specializing in \
precise timing optimization. Your expertise lies in identifying exact dates and times for \
important life events by combining numerological power days with astrological alignments. \
Focus on specific dates and times, not general advice.";

fn build_prompt(req: &EnrichmentRequest<'_>) -> String {
    let dates: Vec<&str> = req
        .dates
        .iter()
        .take(PROMPT_DATE_LIMIT)
        .map(String::as_str)
        .collect();
    format!(
        "As an elite astrologer and numerologist, provide detailed timing analysis for major \
life decisions.\n\n\
PROFILE:\n\
- Life Path Number: {}\n\
- Zodiac Sign: {} ({:?} element)\n\
- Favorable Dates Available: {}\n\n\
PROVIDE RECOMMENDATIONS IN THESE CATEGORIES:\n\n\
1. CAREER & BUSINESS\n\
- Best dates for interviews, negotiations, or launches\n\n\
2. PERSONAL DEVELOPMENT & RELATIONSHIPS\n\
- Prime dates for important personal decisions\n\n\
3. REST & REJUVENATION\n\
- Ideal vacation periods and rest day clusters\n\n\
4. FINANCIAL & LEGAL MATTERS\n\
- Optimal dates for investments, contracts, and planning\n\n\
FORMAT REQUIREMENTS:\n\
- Group recommendations by the favorable dates provided\n\
- Include specific times of day when applicable\n\
- Note date clusters that create especially potent periods",
        req.life_path,
        req.sign.name,
        req.sign.element,
        dates.join(", "),
    )
}

// ── Prose parsing ─────────────────────────────────────────────────────────────

fn bullet_lines(section: &str) -> Vec<String> {
    section
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| line.trim_start_matches('-').trim().to_string())
        .filter(|line| line.len() > MIN_ADVICE_LEN)
        .collect()
}

/// Segment free prose into the typed model.
///
/// Blank-line-separated sections are assigned a category by keyword; bullet
/// lines become advice; dates mentioned in a section get a per-date record
/// with a time-of-day label and a power level counted from emphasis words.
fn parse_prose(content: &str, dates: &[String]) -> Recommendations {
    let mut recs = Recommendations::default();
    let mut current: Option<Category> = None;

    for section in content.split("\n\n") {
        let lower = section.to_lowercase();
        if lower.contains("career") || lower.contains("business") {
            current = Some(Category::Career);
        } else if lower.contains("personal") || lower.contains("relationship") {
            current = Some(Category::Personal);
        } else if lower.contains("rest") || lower.contains("rejuvenation") {
            current = Some(Category::Rest);
        } else if lower.contains("financial") || lower.contains("legal") {
            current = Some(Category::Financial);
        }

        let bullets = bullet_lines(section);

        for date in dates {
            if !lower.contains(date.as_str()) {
                continue;
            }
            let timing = TIME_LABELS
                .iter()
                .find(|label| lower.contains(*label))
                .map(|label| label.to_string());
            let power_level = POWER_WORDS
                .iter()
                .filter(|word| lower.contains(*word))
                .count() as u8;
            recs.date_specific_advice.insert(
                date.clone(),
                DateAdvice {
                    activities: bullets.clone(),
                    timing,
                    power_level,
                    category: current.unwrap_or(Category::Personal),
                },
            );
        }

        if let Some(category) = current {
            let bucket = match category {
                Category::Career => &mut recs.career,
                Category::Personal => &mut recs.personal,
                Category::Rest => &mut recs.rest,
                Category::Financial => &mut recs.financial,
            };
            bucket.extend(bullets);
        }
    }

    let high_power: Vec<String> = recs
        .date_specific_advice
        .iter()
        .filter(|(_, advice)| advice.power_level > 1)
        .map(|(date, _)| date.clone())
        .collect();
    recs.power_periods = power_periods(&high_power, POWER_PERIOD_MAX_GAP_DAYS);

    recs
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        format!("HTTP {status}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "enrichment request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zodiac;

    const SAMPLE_PROSE: &str = "\
1. CAREER & BUSINESS\n\
On 2024-01-03 the alignment is powerful and optimal for negotiations.\n\
- Schedule interviews and contract negotiations in the morning hours\n\
- Launch ventures while momentum from your life path peaks\n\
\n\
2. REST & REJUVENATION\n\
- Plan a short retreat around quiet mid-month evenings\n\
The evening of 2024-01-12 is ideal and perfect for a reset.\n\
\n\
3. FINANCIAL & LEGAL MATTERS\n\
- Review investment allocations during the final week calmly";

    fn sample_dates() -> Vec<String> {
        vec!["2024-01-03".to_string(), "2024-01-12".to_string()]
    }

    #[test]
    fn sections_bucket_by_keyword() {
        let recs = parse_prose(SAMPLE_PROSE, &sample_dates());
        assert_eq!(recs.career.len(), 2);
        assert_eq!(recs.rest.len(), 1);
        assert_eq!(recs.financial.len(), 1);
        assert!(recs.personal.is_empty());
    }

    #[test]
    fn mentioned_dates_get_records_with_timing_and_power() {
        let recs = parse_prose(SAMPLE_PROSE, &sample_dates());
        let career_day = &recs.date_specific_advice["2024-01-03"];
        assert_eq!(career_day.category, Category::Career);
        assert_eq!(career_day.timing.as_deref(), Some("morning"));
        assert_eq!(career_day.power_level, 2); // "powerful" + "optimal"

        let rest_day = &recs.date_specific_advice["2024-01-12"];
        assert_eq!(rest_day.category, Category::Rest);
        assert_eq!(rest_day.timing.as_deref(), Some("evening"));
        assert_eq!(rest_day.power_level, 2); // "ideal" + "perfect"
    }

    #[test]
    fn short_bullets_are_dropped() {
        let prose = "CAREER\n- tiny\n- This bullet is long enough to count as advice";
        let recs = parse_prose(prose, &[]);
        assert_eq!(recs.career.len(), 1);
    }

    #[test]
    fn unrecognizable_prose_parses_vacant() {
        let recs = parse_prose("The stars are silent today.", &sample_dates());
        assert!(recs.is_vacant());
    }

    #[test]
    fn high_power_mentions_cluster_into_periods() {
        // Both sample dates reach power 2 but sit 9 days apart — no period.
        let recs = parse_prose(SAMPLE_PROSE, &sample_dates());
        assert!(recs.power_periods.is_empty());

        let prose = "\
CAREER & BUSINESS\n\
2024-01-03 and 2024-01-05 are powerful, optimal days.\n\
- Stack the most important meetings onto these two days";
        let recs = parse_prose(
            prose,
            &["2024-01-03".to_string(), "2024-01-05".to_string()],
        );
        assert_eq!(recs.power_periods.len(), 1);
        assert_eq!(recs.power_periods[0].duration, 2);
    }

    #[test]
    fn prompt_includes_profile_and_caps_dates() {
        let many: Vec<String> = (1..=12).map(|d| format!("2024-03-{d:02}")).collect();
        let req = EnrichmentRequest {
            birth_date: "1990-01-01",
            life_path: 3,
            sign: zodiac::sign_for(3, 25), // Aries
            dates: &many,
        };
        let prompt = build_prompt(&req);
        assert!(prompt.contains("Life Path Number: 3"));
        assert!(prompt.contains("Aries"));
        assert!(prompt.contains("2024-03-08"));
        assert!(!prompt.contains("2024-03-09")); // beyond the 8-date cap
    }
}
