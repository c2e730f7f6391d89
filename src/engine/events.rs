//! Events emitted by the cycle controller to the presentation layer.

use serde::Serialize;

use crate::types::{Direction, IndicatorSnapshot};

/// Everything a confirmed BUY/SELL alert carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalAlert {
    /// 1-based signal number since startup.
    pub number: u64,
    pub pair: String,
    pub direction: Direction,
    pub confidence: f64,
    pub snapshot: IndicatorSnapshot,
    pub triggers: Vec<String>,
    pub score: u32,
    pub wins: u64,
    pub signals: u64,
    pub headline: String,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CycleEvent {
    Started {
        name: String,
        pairs: Vec<String>,
        threshold: u32,
        cycle_secs: u64,
    },
    CycleStarted {
        cycle: u64,
    },
    PairScanned {
        pair: String,
        snapshot: IndicatorSnapshot,
        buy_score: u32,
        sell_score: u32,
        sentiment: &'static str,
        max_score: u32,
    },
    Hold {
        pair: String,
        buy_score: u32,
        sell_score: u32,
        max_score: u32,
    },
    Signal(SignalAlert),
    CycleFinished {
        cycle: u64,
        cycle_signals: usize,
        pairs: usize,
        total_signals: u64,
        total_wins: u64,
        max_score: u32,
    },
    Countdown {
        seconds_left: u64,
        next_cycle: u64,
    },
    Shutdown {
        cycles: u64,
        signals: u64,
        wins: u64,
    },
}

/// Receives controller events. Implementations render or record them;
/// they must not fail.
pub trait EventSink: Send {
    fn emit(&mut self, event: &CycleEvent);
}

/// Sink that only logs events through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: &CycleEvent) {
        match event {
            CycleEvent::Signal(alert) => tracing::info!(
                pair = %alert.pair,
                direction = %alert.direction,
                score = alert.score,
                confidence = format!("{:.0}%", alert.confidence),
                "Signal"
            ),
            CycleEvent::CycleFinished { cycle, cycle_signals, .. } => {
                tracing::info!(cycle, signals = cycle_signals, "Cycle complete")
            }
            other => tracing::debug!(event = ?other, "Cycle event"),
        }
    }
}
