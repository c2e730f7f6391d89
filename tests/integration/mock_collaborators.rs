//! Scripted collaborators for deterministic controller tests.
//!
//! Each mock records how it was called through shared handles, so test
//! code can inspect calls after the controller has taken ownership.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fxsignal::config::AppConfig;
use fxsignal::data::{SentimentSource, SnapshotProvider};
use fxsignal::engine::events::{CycleEvent, EventSink};
use fxsignal::llm::AdvisorySource;
use fxsignal::types::*;

pub const MOCK_HEADLINE: &str = "Euro rallies on strong growth data";
pub const MOCK_COMMENTARY: &str = "Scripted confirmation";
pub const NO_HEADLINES: &str = "no relevant headlines";

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Nothing fires except sell-side price action (25 points).
pub fn quiet(price: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        price,
        rsi: 50.0,
        stoch: 50.0,
        cci: 0.0,
        macd: 0.0,
        ema_fast: price + 0.0002,
        ema_slow: price - 0.0002,
        adx: 20.0,
        volume: 2.0,
        atr: 0.0025,
        bb_pos: 0.0,
        momentum: 0.0,
        vwap_diff: 0.0,
    }
}

/// Price action, RSI, stochastic, MACD and ADX all on the buy side (90 points).
pub fn bullish(price: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        ema_fast: price - 0.0010,
        rsi: 15.0,
        stoch: 10.0,
        macd: 0.0020,
        adx: 35.0,
        ..quiet(price)
    }
}

/// Price action and RSI on the buy side only (45 points).
pub fn leaning_bullish(price: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        ema_fast: price - 0.0010,
        rsi: 15.0,
        ..quiet(price)
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Returns a fixed snapshot per pair and moves the price book to it.
pub struct ScriptedFeed {
    snapshots: HashMap<String, IndicatorSnapshot>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedFeed {
    pub fn new(snapshots: &[(&str, IndicatorSnapshot)]) -> Self {
        Self {
            snapshots: snapshots
                .iter()
                .map(|(pair, snap)| (pair.to_string(), snap.clone()))
                .collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SnapshotProvider for ScriptedFeed {
    async fn compute(&mut self, pair: &str, prices: &mut PriceBook) -> IndicatorSnapshot {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self
            .snapshots
            .get(pair)
            .cloned()
            .unwrap_or_else(|| quiet(prices.get(pair).unwrap_or(1.0)));
        prices.set(pair, snapshot.price);
        snapshot
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Fixed per-pair bonus once a batch is cached; counts batch fetches.
pub struct MockSentiment {
    bonuses: HashMap<String, i32>,
    pub fetches: Arc<AtomicUsize>,
}

impl MockSentiment {
    pub fn new(bonuses: &[(&str, i32)]) -> Self {
        Self {
            bonuses: bonuses.iter().map(|(p, b)| (p.to_string(), *b)).collect(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SentimentSource for MockSentiment {
    async fn fetch_batch(&self) -> Vec<Headline> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        vec![Headline::new(MOCK_HEADLINE, "")]
    }

    fn bonus_for(&self, pair: &str, batch: &[Headline]) -> SentimentReading {
        match batch.first().and_then(|h| h.title.clone()) {
            Some(headline) => SentimentReading {
                bonus: self.bonuses.get(pair).copied().unwrap_or(0),
                headline,
            },
            None => SentimentReading::neutral(NO_HEADLINES),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

/// Always confirms with the same bonus; records every (pair, bias) asked.
pub struct MockAdvisor {
    bonus: u32,
    pub calls: Arc<Mutex<Vec<(String, Direction)>>>,
}

impl MockAdvisor {
    pub fn new(bonus: u32) -> Self {
        Self {
            bonus,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AdvisorySource for MockAdvisor {
    async fn confirm(
        &self,
        pair: &str,
        _snapshot: &IndicatorSnapshot,
        bias: Direction,
        _headline: &str,
    ) -> Advisory {
        self.calls.lock().unwrap().push((pair.to_string(), bias));
        Advisory {
            bonus: self.bonus,
            commentary: MOCK_COMMENTARY.to_string(),
        }
    }

    fn model_name(&self) -> &str {
        "mock-advisor"
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Records every event for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<CycleEvent>>>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &CycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A config with no delays, scanning `pairs` (seed price 1.0850 each).
pub fn test_config(pairs: &[&str], max_cycles: Option<u64>, news_refresh_cycles: u32) -> AppConfig {
    let mut toml = format!(
        "[agent]\nname = \"TEST\"\ncycle_secs = 0\npair_delay_ms = 0\nnews_refresh_cycles = {news_refresh_cycles}\n"
    );
    if let Some(max) = max_cycles {
        toml.push_str(&format!("max_cycles = {max}\n"));
    }
    for pair in pairs {
        toml.push_str(&format!(
            "\n[[pairs]]\nsymbol = \"{pair}\"\nseed_price = 1.0850\n"
        ));
    }
    AppConfig::from_toml(&toml).unwrap()
}
