//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has built-in defaults, so a missing file or a partial file still
//! yields a complete configuration. Secrets (API keys) are referenced by
//! env-var name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::scoring::weights::{WeightTable, MAX_SCORE};
use crate::types::SignalError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub weights: WeightTable,
    pub pairs: Vec<PairConfig>,
    pub news: NewsConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Minimum score for a BUY/SELL signal.
    pub threshold: u32,
    /// Advisory calls are skipped when the pre-score is below
    /// `threshold - advisory_gate_margin`.
    pub advisory_gate_margin: u32,
    pub cycle_secs: u64,
    pub countdown_step_secs: u64,
    pub pair_delay_ms: u64,
    /// Refresh the cached headline batch every N cycles.
    pub news_refresh_cycles: u32,
    /// Stop after this many cycles; run until interrupted when unset.
    pub max_cycles: Option<u64>,
    /// Seed for the simulated feed; random when unset.
    pub feed_seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "FXSIGNAL".to_string(),
            threshold: 65,
            advisory_gate_margin: 15,
            cycle_secs: 45,
            countdown_step_secs: 5,
            pair_delay_ms: 600,
            news_refresh_cycles: 3,
            max_cycles: None,
            feed_seed: None,
        }
    }
}

impl AgentConfig {
    pub fn pair_delay(&self) -> Duration {
        Duration::from_millis(self.pair_delay_ms)
    }
}

/// A currency pair to scan, with its starting price and the keywords that
/// mark a headline as relevant to it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PairConfig {
    pub symbol: String,
    pub seed_price: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PairConfig {
    fn new(symbol: &str, seed_price: f64, keywords: &[&str]) -> Self {
        Self {
            symbol: symbol.to_string(),
            seed_price,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// The six majors/crosses scanned when no `[[pairs]]` are configured.
pub fn default_pairs() -> Vec<PairConfig> {
    vec![
        PairConfig::new(
            "EURUSD",
            1.0850,
            &["EUR", "euro", "ECB", "eurozone", "USD", "Federal Reserve", "Fed"],
        ),
        PairConfig::new(
            "GBPUSD",
            1.2750,
            &["GBP", "pound", "sterling", "BOE", "Bank of England", "USD"],
        ),
        PairConfig::new("USDJPY", 149.50, &["JPY", "yen", "BOJ", "Bank of Japan", "USD"]),
        PairConfig::new(
            "AUDUSD",
            0.6520,
            &["AUD", "Australian dollar", "RBA", "Reserve Bank Australia", "USD"],
        ),
        PairConfig::new(
            "USDCAD",
            1.3680,
            &["CAD", "Canadian dollar", "BOC", "Bank of Canada", "oil", "USD"],
        ),
        PairConfig::new(
            "EURGBP",
            0.8510,
            &["EUR", "euro", "ECB", "GBP", "pound", "sterling"],
        ),
    ]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key_env: String,
    pub url: String,
    pub query: String,
    pub language: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "NEWS_API_KEY".to_string(),
            url: "https://newsapi.org/v2/everything".to_string(),
            query: "forex OR currency OR EUR OR USD OR GBP OR JPY OR AUD OR CAD".to_string(),
            language: "en".to_string(),
            page_size: 10,
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_tokens: 400,
            temperature: 0.2,
            timeout_secs: 20,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using built-in defaults");
            Ok(Self::default().with_default_pairs())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config.with_default_pairs())
    }

    fn with_default_pairs(mut self) -> Self {
        if self.pairs.is_empty() {
            self.pairs = default_pairs();
        }
        self
    }

    /// Apply `SIGNAL_THRESHOLD` and `CYCLE_SECONDS` from the environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), SignalError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SignalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SIGNAL_THRESHOLD") {
            self.agent.threshold = raw.trim().parse().map_err(|_| {
                SignalError::Config(format!("SIGNAL_THRESHOLD is not an integer: {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup("CYCLE_SECONDS") {
            self.agent.cycle_secs = raw.trim().parse().map_err(|_| {
                SignalError::Config(format!("CYCLE_SECONDS is not an integer: {raw:?}"))
            })?;
        }
        Ok(())
    }

    /// Startup validation. Any error here is fatal: no cycle may run on
    /// a configuration that fails it.
    pub fn validate(&self) -> Result<(), SignalError> {
        self.weights.validate()?;

        if self.agent.threshold > MAX_SCORE {
            return Err(SignalError::Config(format!(
                "threshold {} exceeds maximum score {MAX_SCORE}",
                self.agent.threshold
            )));
        }
        if self.agent.news_refresh_cycles == 0 {
            return Err(SignalError::Config(
                "news_refresh_cycles must be at least 1".to_string(),
            ));
        }
        if self.pairs.is_empty() {
            return Err(SignalError::Config("no pairs configured".to_string()));
        }

        let mut seen = HashSet::new();
        for pair in &self.pairs {
            if !seen.insert(pair.symbol.as_str()) {
                return Err(SignalError::Config(format!(
                    "duplicate pair symbol: {}",
                    pair.symbol
                )));
            }
            if !(pair.seed_price.is_finite() && pair.seed_price > 0.0) {
                return Err(SignalError::Config(format!(
                    "seed price for {} must be positive, got {}",
                    pair.symbol, pair.seed_price
                )));
            }
        }
        Ok(())
    }

    /// Pair symbols in scan order.
    pub fn symbols(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.symbol.clone()).collect()
    }

    pub fn keywords(&self) -> HashMap<String, Vec<String>> {
        self.pairs
            .iter()
            .map(|p| (p.symbol.clone(), p.keywords.clone()))
            .collect()
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
