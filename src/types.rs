//! Shared types for the FXSIGNAL pipeline.
//!
//! These types form the data model used across all modules so that the
//! collaborators, the scoring engine and the cycle controller can depend
//! on them without circular references.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Indicator snapshot
// ---------------------------------------------------------------------------

/// One immutable set of indicator readings for a pair at one evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    /// Relative strength index (0–100).
    pub rsi: f64,
    /// Stochastic oscillator (0–100).
    pub stoch: f64,
    pub cci: f64,
    pub macd: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    /// Average directional index (>= 0).
    pub adx: f64,
    /// Volume relative to its recent average.
    pub volume: f64,
    /// Average true range in price units (>= 0).
    pub atr: f64,
    /// Bollinger band position as a z-score.
    pub bb_pos: f64,
    pub momentum: f64,
    pub vwap_diff: f64,
}

impl IndicatorSnapshot {
    /// ATR expressed in pips (1 pip = 0.0001).
    pub fn atr_pips(&self) -> f64 {
        self.atr * 10_000.0
    }

    /// Whether price trades above the fast EMA.
    pub fn above_fast_ema(&self) -> bool {
        self.price > self.ema_fast
    }

    /// A snapshot where no indicator crosses a scoring threshold.
    /// Price sits below the fast EMA, so only sell-side price action fires.
    #[cfg(test)]
    pub fn neutral() -> Self {
        Self {
            price: 1.0850,
            rsi: 50.0,
            stoch: 50.0,
            cci: 0.0,
            macd: 0.0,
            ema_fast: 1.0852,
            ema_slow: 1.0848,
            adx: 20.0,
            volume: 2.0,
            atr: 0.0025,
            bb_pos: 0.0,
            momentum: 0.0,
            vwap_diff: 0.0,
        }
    }
}

impl fmt::Display for IndicatorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P:{:.5} RSI:{:.1} S:{:.1} CCI:{:.0} MACD:{:+.5} ADX:{:.1}",
            self.price, self.rsi, self.stoch, self.cci, self.macd, self.adx,
        )
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Resolved signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    /// BUY and SELL are actionable; HOLD is not.
    pub fn is_signal(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

// ---------------------------------------------------------------------------
// Score result
// ---------------------------------------------------------------------------

/// Output of one scoring pass. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub buy_score: u32,
    pub sell_score: u32,
    pub direction: Direction,
    /// Labels of the categories that fired, in evaluation order (at most 5).
    pub triggers: Vec<String>,
}

impl ScoreResult {
    /// The larger of the two directional scores.
    pub fn best_score(&self) -> u32 {
        self.buy_score.max(self.sell_score)
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (buy={} sell={}) [{}]",
            self.direction,
            self.buy_score,
            self.sell_score,
            self.triggers.join(", "),
        )
    }
}

// ---------------------------------------------------------------------------
// Collaborator payloads
// ---------------------------------------------------------------------------

/// A news article as returned by NewsAPI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, rename = "publishedAt", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl Headline {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            source: None,
            published_at: None,
        }
    }
}

/// Per-pair sentiment bonus and the headline that best represents it.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentReading {
    /// Bullish positive, bearish negative, within [-10, 10].
    pub bonus: i32,
    pub headline: String,
}

impl SentimentReading {
    pub fn neutral(headline: impl Into<String>) -> Self {
        Self {
            bonus: 0,
            headline: headline.into(),
        }
    }

    /// Display tag for the scan row.
    pub fn tag(&self) -> &'static str {
        match self.bonus.signum() {
            1 => "BULLISH",
            -1 => "BEARISH",
            _ => "NEUTRAL",
        }
    }
}

/// Qualitative confirmation from the advisory model.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    /// Confirmation points within [0, 20].
    pub bonus: u32,
    pub commentary: String,
}

// ---------------------------------------------------------------------------
// Price book
// ---------------------------------------------------------------------------

/// Last known price per pair. Owned by the cycle controller and lent
/// mutably to the snapshot provider for each evaluation.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    prices: HashMap<String, f64>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds<'a>(seeds: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            prices: seeds
                .into_iter()
                .map(|(symbol, price)| (symbol.to_string(), price))
                .collect(),
        }
    }

    pub fn get(&self, pair: &str) -> Option<f64> {
        self.prices.get(pair).copied()
    }

    pub fn set(&mut self, pair: &str, price: f64) {
        self.prices.insert(pair.to_string(), price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cycle state
// ---------------------------------------------------------------------------

/// Process-lifetime counters driven by the cycle controller.
///
/// Starts zeroed and is summarised once at shutdown; nothing here is
/// persisted. Every emitted signal is counted as a win because no outcome
/// evaluation exists, so [`win_rate`] is a display figure, not a real
/// hit rate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleState {
    pub cycles: u64,
    pub signals: u64,
    pub wins: u64,
    pub max_score: u32,
    #[serde(skip)]
    pub headlines: Vec<Headline>,
    /// Cycles since the headline batch was last refreshed.
    pub news_counter: u32,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an emitted BUY/SELL signal.
    pub fn record_signal(&mut self) {
        self.signals += 1;
        self.wins += 1;
    }

    pub fn observe_score(&mut self, score: u32) {
        self.max_score = self.max_score.max(score);
    }

}

/// Win rate as a percentage. Returns 0.0 before the first signal.
pub fn win_rate(wins: u64, signals: u64) -> f64 {
    if signals == 0 {
        0.0
    } else {
        wins as f64 / signals as f64 * 100.0
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} | signals={} | wins={} | win_rate={:.1}% | max_score={}",
            self.cycles,
            self.signals,
            self.wins,
            win_rate(self.wins, self.signals),
            self.max_score,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for FXSIGNAL.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid weight table: categories sum to {total}, expected {expected}")]
    InvalidWeights { total: u32, expected: u32 },

    #[error("Advisory error ({model}): {message}")]
    Advisory { model: String, message: String },

    #[error("News error: {0}")]
    News(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
