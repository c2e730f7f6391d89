//! Simulated indicator feed.
//!
//! Stands in for a live price feed: walks each pair's price randomly and
//! draws indicator readings from signal-biased pools so that scans produce
//! a realistic mix of holds and signals. Seed it for reproducible runs.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::SnapshotProvider;
use crate::types::{IndicatorSnapshot, PriceBook};

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

const RSI_POOL: &[f64] = &[12.0, 18.0, 25.0, 78.0, 82.0, 88.0];
const STOCH_POOL: &[f64] = &[8.0, 12.0, 15.0, 85.0, 88.0, 92.0];
const CCI_POOL: &[f64] = &[-185.0, -170.0, -145.0, 140.0, 165.0, 185.0];
const ADX_POOL: &[f64] = &[28.0, 32.0, 35.0, 38.0, 42.0];
const MACD_POOL: &[f64] = &[0.0018, 0.0022, -0.0017, -0.0020];

/// Fallback price for a pair missing from the book.
const DEFAULT_PRICE: f64 = 1.0;

/// Floor for the walk; one tick at five decimals, so rounding never hits 0.
const MIN_PRICE: f64 = 0.00001;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

pub struct SimulatedFeed {
    rng: StdRng,
}

impl SimulatedFeed {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, pool: &[f64]) -> f64 {
        // Pools are non-empty constants.
        pool.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn jitter(&mut self, spread: f64) -> f64 {
        self.rng.gen_range(-spread..=spread)
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotProvider for SimulatedFeed {
    async fn compute(&mut self, pair: &str, prices: &mut PriceBook) -> IndicatorSnapshot {
        let base = prices.get(pair).unwrap_or_else(|| {
            warn!(pair, "No seed price for pair, starting from default");
            DEFAULT_PRICE
        });

        let volatility = self.rng.gen_range(0.001..0.0025);
        let price = (base + self.jitter(volatility)).max(MIN_PRICE);
        prices.set(pair, price);

        let rsi = self.pick(RSI_POOL) + self.jitter(2.0);
        let stoch = self.pick(STOCH_POOL) + self.jitter(3.0);
        let cci = self.pick(CCI_POOL) + self.jitter(15.0);
        let macd = self.pick(MACD_POOL) + self.jitter(0.0001);

        let ema_fast = price + self.jitter(0.0015);
        let ema_slow = price + self.jitter(0.003);
        let adx = self.pick(ADX_POOL);
        let volume = self.rng.gen_range(1.8..3.2);
        let atr = self.rng.gen_range(0.0018..0.0032);

        let bb_pos = self.jitter(2.0);
        let momentum = self.jitter(1.0);
        let vwap_diff = self.jitter(0.002);

        let snapshot = IndicatorSnapshot {
            price: round_to(price, 5),
            rsi: round_to(rsi, 1),
            stoch: round_to(stoch, 1),
            cci: round_to(cci, 0),
            macd: round_to(macd, 5),
            ema_fast: round_to(ema_fast, 5),
            ema_slow: round_to(ema_slow, 5),
            adx: round_to(adx, 1),
            volume: round_to(volume, 2),
            atr: round_to(atr, 5),
            bb_pos: round_to(bb_pos, 2),
            momentum: round_to(momentum, 3),
            vwap_diff: round_to(vwap_diff, 5),
        };

        debug!(pair, %snapshot, "Simulated snapshot");
        snapshot
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
