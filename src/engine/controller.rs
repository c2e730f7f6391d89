//! Cycle controller: the sweep, score, confirm and emit loop.
//!
//! Drives an unbounded sequence of cycles over the configured pairs. Each
//! pair goes through a two-pass scoring protocol: a cheap pre-score without
//! the advisory bonus decides whether the advisory model is consulted at
//! all, then the final score (with the real bonus) decides the direction.
//!
//! Everything runs sequentially on one task. The controller exclusively
//! owns the price book and the cycle counters, so no locking is involved.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::events::{CycleEvent, EventSink, SignalAlert};
use crate::config::AppConfig;
use crate::data::{SentimentSource, SnapshotProvider};
use crate::llm::AdvisorySource;
use crate::scoring::{confidence, ScoringEngine};
use crate::types::{CycleState, PriceBook, SignalError};

/// Commentary used when the pre-score doesn't clear the advisory gate.
pub const NO_ADVISORY: &str = "No AI analysis (score below threshold)";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Cadence and gate parameters, copied out of `AgentConfig`.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub name: String,
    pub threshold: u32,
    pub gate_margin: u32,
    pub pair_delay: Duration,
    pub cycle_secs: u64,
    pub countdown_step_secs: u64,
    pub news_refresh_cycles: u32,
    pub max_cycles: Option<u64>,
}

impl ControllerSettings {
    /// Minimum pre-score that earns an advisory call.
    pub fn gate(&self) -> u32 {
        self.threshold.saturating_sub(self.gate_margin)
    }
}

impl From<&AppConfig> for ControllerSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            name: cfg.agent.name.clone(),
            threshold: cfg.agent.threshold,
            gate_margin: cfg.agent.advisory_gate_margin,
            pair_delay: cfg.agent.pair_delay(),
            cycle_secs: cfg.agent.cycle_secs,
            countdown_step_secs: cfg.agent.countdown_step_secs,
            news_refresh_cycles: cfg.agent.news_refresh_cycles,
            max_cycles: cfg.agent.max_cycles,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct CycleController {
    settings: ControllerSettings,
    pairs: Vec<String>,
    prices: PriceBook,
    scorer: ScoringEngine,
    feed: Box<dyn SnapshotProvider>,
    sentiment: Box<dyn SentimentSource>,
    advisor: Box<dyn AdvisorySource>,
    sink: Box<dyn EventSink>,
    state: CycleState,
}

impl CycleController {
    /// Build a controller from a configuration, validating it first.
    ///
    /// Counters start zeroed and prices start at the configured seeds.
    pub fn new(
        config: &AppConfig,
        feed: Box<dyn SnapshotProvider>,
        sentiment: Box<dyn SentimentSource>,
        advisor: Box<dyn AdvisorySource>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, SignalError> {
        config.validate()?;

        let prices = PriceBook::from_seeds(
            config
                .pairs
                .iter()
                .map(|p| (p.symbol.as_str(), p.seed_price)),
        );

        Ok(Self {
            settings: ControllerSettings::from(config),
            pairs: config.symbols(),
            prices,
            scorer: ScoringEngine::new(config.weights),
            feed,
            sentiment,
            advisor,
            sink,
            state: CycleState::new(),
        })
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn prices(&self) -> &PriceBook {
        &self.prices
    }

    /// Run cycles until `shutdown` resolves (or `max_cycles` is reached),
    /// then emit the shutdown summary and return the final counters.
    ///
    /// An interrupted cycle is simply dropped; nothing is persisted, so
    /// there is nothing to roll back.
    pub async fn run<F>(&mut self, shutdown: F) -> CycleState
    where
        F: Future<Output = ()>,
    {
        self.sink.emit(&CycleEvent::Started {
            name: self.settings.name.clone(),
            pairs: self.pairs.clone(),
            threshold: self.settings.threshold,
            cycle_secs: self.settings.cycle_secs,
        });
        info!(
            pairs = self.pairs.len(),
            threshold = self.settings.threshold,
            feed = self.feed.name(),
            advisor = self.advisor.model_name(),
            "Entering cycle loop. Press Ctrl+C to stop."
        );

        tokio::pin!(shutdown);
        tokio::select! {
            biased;
            _ = &mut shutdown => info!("Shutdown signal received."),
            _ = self.cycle_loop() => info!(cycles = self.state.cycles, "Cycle limit reached."),
        }

        self.sink.emit(&CycleEvent::Shutdown {
            cycles: self.state.cycles,
            signals: self.state.signals,
            wins: self.state.wins,
        });
        info!(summary = %self.state, "Scanner stopped.");

        self.state.clone()
    }

    async fn cycle_loop(&mut self) {
        let mut cycle = self.state.cycles;
        loop {
            cycle += 1;
            self.run_cycle(cycle).await;
            if self.settings.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }
            self.countdown(cycle).await;
            // Give the shutdown branch a chance even with zero delays.
            tokio::task::yield_now().await;
        }
    }

    /// One sweep over every pair. Returns the number of signals emitted.
    pub async fn run_cycle(&mut self, cycle: u64) -> usize {
        self.refresh_news_if_needed().await;
        self.sink.emit(&CycleEvent::CycleStarted { cycle });

        let pairs = self.pairs.clone();
        let mut cycle_signals = 0;
        for (i, pair) in pairs.iter().enumerate() {
            if self.analyse_pair(pair).await {
                cycle_signals += 1;
            }
            if i + 1 < pairs.len() && !self.settings.pair_delay.is_zero() {
                tokio::time::sleep(self.settings.pair_delay).await;
            }
        }

        self.state.cycles = cycle;
        self.sink.emit(&CycleEvent::CycleFinished {
            cycle,
            cycle_signals,
            pairs: pairs.len(),
            total_signals: self.state.signals,
            total_wins: self.state.wins,
            max_score: self.state.max_score,
        });
        debug!(cycle, cycle_signals, state = %self.state, "Cycle complete");

        cycle_signals
    }

    /// Fetch a fresh headline batch every `news_refresh_cycles` cycles.
    /// Cycles before the first fetch score against an empty batch.
    /// Returns whether a fetch happened.
    pub async fn refresh_news_if_needed(&mut self) -> bool {
        self.state.news_counter += 1;
        if self.state.news_counter < self.settings.news_refresh_cycles {
            return false;
        }
        self.state.headlines = self.sentiment.fetch_batch().await;
        self.state.news_counter = 0;
        debug!(headlines = self.state.headlines.len(), "Headline cache refreshed");
        true
    }

    /// Full two-pass analysis for one pair. Returns true if a signal fired.
    pub async fn analyse_pair(&mut self, pair: &str) -> bool {
        let threshold = self.settings.threshold;

        // 1. Indicators (may move the pair's price)
        let snapshot = self.feed.compute(pair, &mut self.prices).await;

        // 2. News sentiment from the cached batch
        let reading = self.sentiment.bonus_for(pair, &self.state.headlines);

        // 3. Pre-score without the advisory bonus
        let pre = self.scorer.score(&snapshot, reading.bonus, 0, threshold);

        // 4. Advisory confirmation, only when the pre-score looks promising
        let (advisory_bonus, commentary) = if pre.best_score() >= self.settings.gate() {
            let advisory = self
                .advisor
                .confirm(pair, &snapshot, pre.direction, &reading.headline)
                .await;
            (advisory.bonus, advisory.commentary)
        } else {
            (0, NO_ADVISORY.to_string())
        };

        // 5. Final score
        let result = self
            .scorer
            .score(&snapshot, reading.bonus, advisory_bonus, threshold);
        let best = result.best_score();
        self.state.observe_score(best);

        debug!(
            pair,
            pre_buy = pre.buy_score,
            pre_sell = pre.sell_score,
            news = reading.bonus,
            advisory = advisory_bonus,
            buy = result.buy_score,
            sell = result.sell_score,
            direction = %result.direction,
            "Pair scored"
        );

        self.sink.emit(&CycleEvent::PairScanned {
            pair: pair.to_string(),
            snapshot: snapshot.clone(),
            buy_score: result.buy_score,
            sell_score: result.sell_score,
            sentiment: reading.tag(),
            max_score: self.state.max_score,
        });

        // 6. Emit signal or hold
        if !result.direction.is_signal() {
            self.sink.emit(&CycleEvent::Hold {
                pair: pair.to_string(),
                buy_score: result.buy_score,
                sell_score: result.sell_score,
                max_score: self.state.max_score,
            });
            return false;
        }

        self.state.record_signal();
        let alert = SignalAlert {
            number: self.state.signals,
            pair: pair.to_string(),
            direction: result.direction,
            confidence: confidence(best),
            snapshot,
            triggers: result.triggers,
            score: best,
            wins: self.state.wins,
            signals: self.state.signals,
            headline: reading.headline,
            commentary,
        };
        info!(
            pair,
            direction = %alert.direction,
            score = best,
            confidence = format!("{:.0}%", alert.confidence),
            "Signal emitted"
        );
        self.sink.emit(&CycleEvent::Signal(alert));
        true
    }

    /// Countdown to the next cycle, ticking every `countdown_step_secs`.
    async fn countdown(&mut self, cycle: u64) {
        let step = self.settings.countdown_step_secs.max(1);
        let mut left = self.settings.cycle_secs;
        while left > 0 {
            self.sink.emit(&CycleEvent::Countdown {
                seconds_left: left,
                next_cycle: cycle + 1,
            });
            let nap = step.min(left);
            tokio::time::sleep(Duration::from_secs(nap)).await;
            left -= nap;
        }
    }
}
