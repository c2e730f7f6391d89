//! News sentiment source.
//!
//! Pulls the latest forex/macro headlines from NewsAPI and turns the ones
//! relevant to a pair into a bounded sentiment bonus. Without an API key,
//! or when the request fails, a built-in headline batch is used so the
//! scan keeps running.
//!
//! API: `https://newsapi.org/v2/everything`
//! Auth: API key via `apiKey` query param. Free tier: 100 req/day.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::SentimentSource;
use crate::config::NewsConfig;
use crate::types::{Headline, SentimentReading, SignalError};

// ---------------------------------------------------------------------------
// Sentiment vocabulary
// ---------------------------------------------------------------------------

const BULLISH_WORDS: &[&str] = &[
    "rally", "surge", "gains", "bullish", "rise", "soar", "strong", "hawkish",
    "growth", "beat", "upgrade",
];

const BEARISH_WORDS: &[&str] = &[
    "fall", "drop", "plunge", "bearish", "weak", "dovish", "miss", "slowdown",
    "decline", "downgrade", "recession",
];

/// Only the first few relevant headlines contribute to the bonus.
const SCORED_HEADLINES: usize = 5;

/// Points per net bullish (or bearish) word.
const POINTS_PER_WORD: i32 = 2;

/// Bonus bound in either direction.
pub const MAX_NEWS_BONUS: i32 = 10;

pub const NO_RELEVANT_HEADLINES: &str = "no relevant headlines";

/// Net bullish word count: each listed word counts once if it appears anywhere.
fn word_balance(text: &str) -> i32 {
    let lower = text.to_lowercase();
    let bull = BULLISH_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;
    let bear = BEARISH_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;
    bull - bear
}

// ---------------------------------------------------------------------------
// NewsAPI response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default, rename = "totalResults")]
    total_results: u32,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<NewsSource>,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsSource {
    #[serde(default)]
    name: Option<String>,
}

impl From<NewsArticle> for Headline {
    fn from(a: NewsArticle) -> Self {
        Headline {
            title: a.title,
            description: a.description,
            source: a.source.and_then(|s| s.name),
            published_at: a.published_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct NewsClient {
    http: Client,
    api_key: Option<SecretString>,
    config: NewsConfig,
    /// Lowercased relevance keywords per pair symbol.
    keywords: HashMap<String, Vec<String>>,
}

impl NewsClient {
    pub fn new(
        config: NewsConfig,
        api_key: Option<String>,
        keywords: HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("FXSIGNAL/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build news HTTP client")?;

        let keywords = keywords
            .into_iter()
            .map(|(pair, words)| (pair, words.iter().map(|w| w.to_lowercase()).collect()))
            .collect();

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.is_empty()).map(SecretString::new),
            config,
            keywords,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_url(&self, key: &str) -> String {
        format!(
            "{}?q={}&language={}&pageSize={}&sortBy=publishedAt&apiKey={}",
            self.config.url,
            urlencoding::encode(&self.config.query),
            urlencoding::encode(&self.config.language),
            self.config.page_size,
            urlencoding::encode(key),
        )
    }

    async fn fetch_live(&self, key: &str) -> Result<Vec<Headline>> {
        let resp = self
            .http
            .get(self.build_url(key))
            .send()
            .await
            .context("NewsAPI request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SignalError::News(format!("HTTP {status}: {body}")).into());
        }

        let data: NewsApiResponse = resp
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;

        if data.status != "ok" {
            return Err(SignalError::News(
                data.message.unwrap_or_else(|| format!("status '{}'", data.status)),
            )
            .into());
        }

        debug!(
            fetched = data.articles.len(),
            total = data.total_results,
            "Fetched headlines from NewsAPI"
        );
        Ok(data.articles.into_iter().map(Headline::from).collect())
    }

    /// Headlines whose title mentions one of the pair's keywords.
    fn relevant<'a>(&self, pair: &str, batch: &'a [Headline]) -> Vec<&'a Headline> {
        let Some(keywords) = self.keywords.get(pair) else {
            return Vec::new();
        };
        batch
            .iter()
            .filter(|h| {
                let title = h.title.as_deref().unwrap_or("").to_lowercase();
                keywords.iter().any(|kw| title.contains(kw.as_str()))
            })
            .collect()
    }

    /// Fallback batch so the bot works without a live API key.
    pub fn mock_headlines() -> Vec<Headline> {
        vec![
            Headline::new(
                "EUR/USD holds steady as ECB signals cautious stance",
                "Euro gains on hawkish ECB tone",
            ),
            Headline::new(
                "GBP rallies after strong UK employment data",
                "Sterling surge on bullish jobs report",
            ),
            Headline::new(
                "USD weakens amid Fed dovish commentary",
                "Dollar drops on weak outlook",
            ),
            Headline::new(
                "AUD declines on RBA rate hold decision",
                "Australian dollar falls on dovish RBA",
            ),
            Headline::new(
                "USD/CAD edges higher on oil price decline",
                "Loonie weakens as oil drops",
            ),
            Headline::new(
                "EUR/GBP stable as both central banks stay on hold",
                "Cross rate holds tight range",
            ),
            Headline::new(
                "Yen strengthens on BOJ hawkish shift expectations",
                "JPY bullish on BOJ signals",
            ),
        ]
    }
}

#[async_trait]
impl SentimentSource for NewsClient {
    async fn fetch_batch(&self) -> Vec<Headline> {
        let Some(key) = &self.api_key else {
            warn!("NEWS_API_KEY not set, using mock headlines");
            return Self::mock_headlines();
        };

        match self.fetch_live(key.expose_secret()).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "NewsAPI unavailable, using mock headlines");
                Self::mock_headlines()
            }
        }
    }

    fn bonus_for(&self, pair: &str, batch: &[Headline]) -> SentimentReading {
        let relevant = self.relevant(pair, batch);
        let Some(top) = relevant.first() else {
            return SentimentReading::neutral(NO_RELEVANT_HEADLINES);
        };

        let headline = top
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("—")
            .to_string();

        let total: i32 = relevant
            .iter()
            .take(SCORED_HEADLINES)
            .map(|h| {
                let text = format!(
                    "{} {}",
                    h.title.as_deref().unwrap_or(""),
                    h.description.as_deref().unwrap_or("")
                );
                word_balance(&text)
            })
            .sum();

        let bonus = (total * POINTS_PER_WORD).clamp(-MAX_NEWS_BONUS, MAX_NEWS_BONUS);
        debug!(pair, bonus, relevant = relevant.len(), "News sentiment");

        SentimentReading { bonus, headline }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
