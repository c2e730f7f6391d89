//! Anthropic Claude advisory integration.
//!
//! Implements the `AdvisorySource` trait using the Anthropic Messages API.
//! Handles prompt construction, response parsing, cost tracking and
//! rate limiting with exponential backoff. Without an API key, or whenever
//! the call or the parse fails, a canned mock opinion is returned.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::AdvisorySource;
use crate::config::LlmConfig;
use crate::types::{Advisory, Direction, IndicatorSnapshot, SignalError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 500;

/// Approximate cost per 1K input tokens (Sonnet).
const INPUT_COST_PER_1K: f64 = 0.003;
/// Approximate cost per 1K output tokens (Sonnet).
const OUTPUT_COST_PER_1K: f64 = 0.015;

/// Upper bound of the confirmation bonus.
pub const MAX_ADVISORY_BONUS: u32 = 20;

const SYSTEM_PROMPT: &str = "You are a professional forex trading analyst assistant embedded in \
an algorithmic scalping system. You receive:\n\
  - A currency pair symbol\n\
  - Key technical indicator values\n\
  - A direction bias (BUY / SELL / HOLD) produced by the technical model\n\
  - A recent news headline about that pair\n\n\
Your job is to give a concise second opinion (2-3 sentences maximum) and assign a \
confidence boost score from 0 to 20 (integer) that will be added to the technical \
score. Score 0 means you disagree or see no confirmation; score 20 means you strongly \
confirm the signal.\n\n\
Respond ONLY in this exact format (no extra text):\n\
SCORE: <integer 0-20>\n\
ANALYSIS: <2-3 sentence qualitative comment>";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnthropicAdvisor {
    http: Client,
    api_key: Option<SecretString>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    total_cost: AtomicU64, // stored as cost * 1_000_000
    total_calls: AtomicU64,
    fallbacks: AtomicU64,
}

impl AnthropicAdvisor {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.is_empty()).map(SecretString::new),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            total_cost: AtomicU64::new(0),
            total_calls: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        })
    }

    /// True when no key is configured and every call answers from the mock.
    pub fn is_mock(&self) -> bool {
        self.api_key.is_none()
    }

    /// Send a messages request with retry + backoff.
    async fn call_api(&self, key: &str, user_message: &str) -> Result<(String, u32, f64)> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying Anthropic API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: MessagesResponse = response
                            .json()
                            .await
                            .context("Failed to parse Anthropic response")?;

                        let text = body
                            .content
                            .iter()
                            .filter_map(|b| b.text.as_deref())
                            .collect::<Vec<_>>()
                            .join("");

                        let usage = body.usage.unwrap_or_default();
                        let total_tokens = usage.input_tokens + usage.output_tokens;
                        let cost = (usage.input_tokens as f64 / 1000.0) * INPUT_COST_PER_1K
                            + (usage.output_tokens as f64 / 1000.0) * OUTPUT_COST_PER_1K;

                        let cost_micro = (cost * 1_000_000.0) as u64;
                        self.total_cost.fetch_add(cost_micro, Ordering::Relaxed);
                        self.total_calls.fetch_add(1, Ordering::Relaxed);

                        return Ok((text, total_tokens, cost));
                    }

                    // Retryable errors: 429 (rate limit), 500+, 529 (overloaded)
                    if status.as_u16() == 429 || status.is_server_error() {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable Anthropic API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    return Err(SignalError::Advisory {
                        model: self.model.clone(),
                        message: format!("HTTP {status}: {error_text}"),
                    }
                    .into());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Anthropic request failed");
                    last_error = Some(format!("Request error: {e}"));
                }
            }
        }

        Err(SignalError::Advisory {
            model: self.model.clone(),
            message: format!(
                "failed after {MAX_RETRIES} retries: {}",
                last_error.unwrap_or_default()
            ),
        }
        .into())
    }

    /// Build the user prompt for one pair.
    pub fn build_prompt(
        pair: &str,
        snapshot: &IndicatorSnapshot,
        bias: Direction,
        headline: &str,
    ) -> String {
        format!(
            "Pair: {pair}\n\
             Direction bias: {bias}\n\
             Price: {:.5}\n\
             RSI: {:.1}  |  Stochastic: {:.1}  |  CCI: {:.0}\n\
             MACD: {:+.5}  |  ADX: {:.1}  |  ATR: {:.1} pips\n\
             EMA fast/slow: {:.5} / {:.5}\n\
             News headline: {headline}\n\n\
             Please evaluate whether this trade signal is supported by the technical \
             picture and the news, then provide your SCORE and ANALYSIS.",
            snapshot.price,
            snapshot.rsi,
            snapshot.stoch,
            snapshot.cci,
            snapshot.macd,
            snapshot.adx,
            snapshot.atr_pips(),
            snapshot.ema_fast,
            snapshot.ema_slow,
        )
    }

    /// Extract SCORE and ANALYSIS from the model's reply.
    ///
    /// The score is clamped into [0, 20]. A reply without a readable
    /// SCORE line earns no points; a missing ANALYSIS line leaves the whole
    /// reply as commentary.
    pub fn parse_response(raw: &str) -> Advisory {
        let mut score: Option<i64> = None;
        let mut analysis: Option<String> = None;

        for line in raw.lines().map(str::trim) {
            if score.is_none() {
                if let Some(rest) = Self::strip_label(line, "SCORE:") {
                    score = Self::extract_int(rest);
                    continue;
                }
            }
            if analysis.is_none() {
                if let Some(rest) = Self::strip_label(line, "ANALYSIS:") {
                    analysis = Some(rest.trim().to_string());
                }
            }
        }

        let bonus = match score {
            Some(score) => score.clamp(0, MAX_ADVISORY_BONUS as i64) as u32,
            None => {
                warn!("No readable SCORE in advisory reply, scoring 0");
                0
            }
        };

        Advisory {
            bonus,
            commentary: analysis.unwrap_or_else(|| raw.trim().to_string()),
        }
    }

    /// Case-insensitive label match; returns the text after the label.
    fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
        let head = line.get(..label.len())?;
        head.eq_ignore_ascii_case(label)
            .then(|| &line[label.len()..])
    }

    /// Parse a leading (optionally signed) integer, ignoring surrounding space.
    fn extract_int(text: &str) -> Option<i64> {
        let text = text.trim();
        let end = text
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        text[..end].parse().ok()
    }

    /// Canned opinion used when the API key is absent or the call fails.
    pub fn mock_response(bias: Direction) -> Advisory {
        let (bonus, commentary) = match bias {
            Direction::Buy => (
                12,
                "Indicators suggest oversold conditions with momentum building; moderate bullish confirmation.",
            ),
            Direction::Sell => (
                12,
                "Overbought readings align with bearish momentum; moderate sell confirmation.",
            ),
            Direction::Hold => (
                0,
                "Mixed signals, no strong directional conviction from AI analysis.",
            ),
        };
        Advisory {
            bonus,
            commentary: commentary.to_string(),
        }
    }

    async fn ask(
        &self,
        key: &str,
        pair: &str,
        snapshot: &IndicatorSnapshot,
        bias: Direction,
        headline: &str,
    ) -> Result<Advisory> {
        let prompt = Self::build_prompt(pair, snapshot, bias, headline);
        let (text, tokens, cost) = self
            .call_api(key, &prompt)
            .await
            .context("Anthropic API call failed")?;
        let advisory = Self::parse_response(&text);

        info!(
            pair,
            bias = %bias,
            bonus = advisory.bonus,
            tokens,
            cost = format!("${:.4}", cost),
            "Advisory complete"
        );
        Ok(advisory)
    }

    /// Total cumulative cost across all calls.
    pub fn cumulative_cost(&self) -> f64 {
        self.total_cost.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Total number of successful API calls made.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Number of confirmations answered from the mock after a failure.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// AdvisorySource implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl AdvisorySource for AnthropicAdvisor {
    async fn confirm(
        &self,
        pair: &str,
        snapshot: &IndicatorSnapshot,
        bias: Direction,
        headline: &str,
    ) -> Advisory {
        let Some(key) = &self.api_key else {
            return Self::mock_response(bias);
        };

        match self.ask(key.expose_secret(), pair, snapshot, bias, headline).await {
            Ok(advisory) => advisory,
            Err(e) => {
                warn!(pair, error = %format!("{e:#}"), "Advisory unavailable, using mock");
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                Self::mock_response(bias)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
