//! Scoring engine: indicator readings and bonuses to a directional score.
//!
//! Categories are evaluated in a fixed order, each adding its weight to the
//! buy or sell side and recording a trigger label. The engine is pure and
//! total: the same inputs always produce the same `ScoreResult`.

pub mod weights;

use crate::types::{Direction, IndicatorSnapshot, ScoreResult};
use weights::WeightTable;

// ---------------------------------------------------------------------------
// Trigger levels
// ---------------------------------------------------------------------------

const RSI_OVERSOLD: f64 = 22.0;
const RSI_OVERBOUGHT: f64 = 82.0;
const STOCH_OVERSOLD: f64 = 15.0;
const STOCH_OVERBOUGHT: f64 = 88.0;
const MACD_LEVEL: f64 = 0.0015;
const ADX_TRENDING: f64 = 30.0;

/// Triggers beyond this count are dropped, keeping evaluation order.
pub const MAX_TRIGGERS: usize = 5;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

const CONFIDENCE_CEILING: f64 = 97.0;

/// Map a raw best score to the displayed confidence percentage.
///
/// Monotone and saturating at 97. Not a statistical confidence.
pub fn confidence(best_score: u32) -> f64 {
    (80.0 + (best_score as f64 - 50.0) * 0.7).min(CONFIDENCE_CEILING)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Running totals for one scoring pass.
#[derive(Default)]
struct Tally {
    buy: u32,
    sell: u32,
    triggers: Vec<String>,
}

impl Tally {
    fn buy(&mut self, points: u32, label: impl Into<String>) {
        self.buy += points;
        self.triggers.push(label.into());
    }

    fn sell(&mut self, points: u32, label: impl Into<String>) {
        self.sell += points;
        self.triggers.push(label.into());
    }

    /// Credit whichever side leads right now (ties go to buy).
    fn leader(&mut self, points: u32, label: impl Into<String>) {
        if self.buy >= self.sell {
            self.buy(points, label);
        } else {
            self.sell(points, label);
        }
    }
}

/// Deterministic scorer parameterised by a validated [`WeightTable`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: WeightTable,
}

impl ScoringEngine {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    /// Score a snapshot.
    ///
    /// `sentiment_bonus` is clamped to ±`news_boost` and `advisory_bonus`
    /// to `ai_confirm`. The advisory bonus goes to whichever side holds the
    /// larger score after every other category has been applied.
    pub fn score(
        &self,
        snapshot: &IndicatorSnapshot,
        sentiment_bonus: i32,
        advisory_bonus: u32,
        threshold: u32,
    ) -> ScoreResult {
        let w = &self.weights;
        let mut t = Tally::default();

        // Price action
        if snapshot.above_fast_ema() {
            t.buy(w.price_action, "PA↑");
        } else {
            t.sell(w.price_action, "PA↓");
        }

        // RSI extremes
        if snapshot.rsi < RSI_OVERSOLD {
            t.buy(w.rsi, "RSI-OB");
        } else if snapshot.rsi > RSI_OVERBOUGHT {
            t.sell(w.rsi, "RSI+OS");
        }

        // Stochastic
        if snapshot.stoch < STOCH_OVERSOLD {
            t.buy(w.stoch_cci, "STOCH-");
        } else if snapshot.stoch > STOCH_OVERBOUGHT {
            t.sell(w.stoch_cci, "STOCH+");
        }

        // MACD
        if snapshot.macd > MACD_LEVEL {
            t.buy(w.macd, "MACD+");
        } else if snapshot.macd < -MACD_LEVEL {
            t.sell(w.macd, "MACD-");
        }

        // Trend strength follows the price-action side.
        if snapshot.adx > ADX_TRENDING {
            let label = format!("ADX{:.0}", snapshot.adx);
            if snapshot.above_fast_ema() {
                t.buy(w.adx, label);
            } else {
                t.sell(w.adx, label);
            }
        }

        // News sentiment
        let limit = w.news_boost as i32;
        let news = sentiment_bonus.clamp(-limit, limit);
        if news > 0 {
            t.buy(news.unsigned_abs(), format!("NEWS+{news}"));
        } else if news < 0 {
            t.sell(news.unsigned_abs(), format!("NEWS{news}"));
        }

        // Advisory confirmation
        let advisory = advisory_bonus.min(w.ai_confirm);
        if advisory > 0 {
            t.leader(advisory, format!("AI+{advisory}"));
        }

        let direction = resolve_direction(t.buy, t.sell, threshold);
        t.triggers.truncate(MAX_TRIGGERS);

        ScoreResult {
            buy_score: t.buy,
            sell_score: t.sell,
            direction,
            triggers: t.triggers,
        }
    }
}

/// BUY wins ties; SELL needs a strict lead.
fn resolve_direction(buy: u32, sell: u32, threshold: u32) -> Direction {
    if buy >= threshold && buy >= sell {
        Direction::Buy
    } else if sell >= threshold && sell > buy {
        Direction::Sell
    } else {
        Direction::Hold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
