//! End-to-end cycles over scripted collaborators.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use fxsignal::engine::controller::CycleController;
use fxsignal::engine::events::{CycleEvent, EventSink, SignalAlert};
use fxsignal::types::{Direction, SignalError};

use crate::mock_collaborators::*;

struct Harness {
    controller: CycleController,
    feed_calls: Arc<std::sync::atomic::AtomicUsize>,
    fetches: Arc<std::sync::atomic::AtomicUsize>,
    advisor_calls: Arc<Mutex<Vec<(String, Direction)>>>,
    events: Arc<Mutex<Vec<CycleEvent>>>,
}

impl Harness {
    fn new(
        config: fxsignal::config::AppConfig,
        feed: ScriptedFeed,
        sentiment: MockSentiment,
        advisor: MockAdvisor,
    ) -> Self {
        let sink = RecordingSink::default();
        let events = Arc::clone(&sink.events);
        Self::with_sink(config, feed, sentiment, advisor, Box::new(sink), events)
    }

    fn with_sink(
        config: fxsignal::config::AppConfig,
        feed: ScriptedFeed,
        sentiment: MockSentiment,
        advisor: MockAdvisor,
        sink: Box<dyn EventSink>,
        events: Arc<Mutex<Vec<CycleEvent>>>,
    ) -> Self {
        let feed_calls = Arc::clone(&feed.calls);
        let fetches = Arc::clone(&sentiment.fetches);
        let advisor_calls = Arc::clone(&advisor.calls);
        let controller = CycleController::new(
            &config,
            Box::new(feed),
            Box::new(sentiment),
            Box::new(advisor),
            sink,
        )
        .unwrap();
        Self {
            controller,
            feed_calls,
            fetches,
            advisor_calls,
            events,
        }
    }

    fn events(&self) -> Vec<CycleEvent> {
        self.events.lock().unwrap().clone()
    }

    fn alerts(&self) -> Vec<SignalAlert> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CycleEvent::Signal(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }

    fn holds(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, CycleEvent::Hold { .. }))
            .count()
    }
}

#[tokio::test]
async fn test_bullish_pair_emits_confirmed_buy() {
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(1), 1),
        ScriptedFeed::new(&[("EURUSD", bullish(1.0862))]),
        MockSentiment::new(&[("EURUSD", 10)]),
        MockAdvisor::new(12),
    );

    let state = h.controller.run(std::future::pending()).await;

    assert_eq!(state.cycles, 1);
    assert_eq!(state.signals, 1);
    assert_eq!(state.wins, 1);
    assert_eq!(state.max_score, 112);

    let calls = h.advisor_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("EURUSD".to_string(), Direction::Buy)]);

    let alerts = h.alerts();
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.number, 1);
    assert_eq!(alert.direction, Direction::Buy);
    assert_eq!(alert.score, 112);
    assert!((alert.confidence - 97.0).abs() < 1e-9);
    assert_eq!(
        alert.triggers,
        vec!["PA↑", "RSI-OB", "STOCH-", "MACD+", "ADX35"]
    );
    assert_eq!(alert.headline, MOCK_HEADLINE);
    assert_eq!(alert.commentary, MOCK_COMMENTARY);
    assert_eq!((alert.wins, alert.signals), (1, 1));
}

#[tokio::test]
async fn test_event_order_for_one_cycle() {
    let mut h = Harness::new(
        test_config(&["EURUSD", "GBPUSD"], Some(1), 3),
        ScriptedFeed::new(&[("EURUSD", bullish(1.0862)), ("GBPUSD", quiet(1.2750))]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    h.controller.run(std::future::pending()).await;

    let kinds: Vec<&'static str> = h
        .events()
        .iter()
        .map(|e| match e {
            CycleEvent::Started { .. } => "started",
            CycleEvent::CycleStarted { .. } => "cycle_started",
            CycleEvent::PairScanned { .. } => "scanned",
            CycleEvent::Hold { .. } => "hold",
            CycleEvent::Signal(_) => "signal",
            CycleEvent::CycleFinished { .. } => "cycle_finished",
            CycleEvent::Countdown { .. } => "countdown",
            CycleEvent::Shutdown { .. } => "shutdown",
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            "started",
            "cycle_started",
            "scanned",
            "signal",
            "scanned",
            "hold",
            "cycle_finished",
            "shutdown"
        ]
    );
}

#[tokio::test]
async fn test_advisor_skipped_below_gate() {
    // 25 + 20 + 4 = 49, one short of the 50-point gate.
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(1), 1),
        ScriptedFeed::new(&[("EURUSD", leaning_bullish(1.0862))]),
        MockSentiment::new(&[("EURUSD", 4)]),
        MockAdvisor::new(20),
    );
    let state = h.controller.run(std::future::pending()).await;

    assert!(h.advisor_calls.lock().unwrap().is_empty());
    assert_eq!(state.signals, 0);
    assert_eq!(state.max_score, 49);
    assert_eq!(h.holds(), 1);
}

#[tokio::test]
async fn test_gate_is_inclusive_and_advisory_lifts_to_signal() {
    // 25 + 20 + 5 = 50 reaches the gate; the pre-score alone is a HOLD.
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(1), 1),
        ScriptedFeed::new(&[("EURUSD", leaning_bullish(1.0862))]),
        MockSentiment::new(&[("EURUSD", 5)]),
        MockAdvisor::new(20),
    );
    let state = h.controller.run(std::future::pending()).await;

    let calls = h.advisor_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("EURUSD".to_string(), Direction::Hold)]);

    assert_eq!(state.signals, 1);
    let alert = &h.alerts()[0];
    assert_eq!(alert.score, 70);
    assert!((alert.confidence - 94.0).abs() < 1e-9);
    assert!(alert.triggers.contains(&"AI+20".to_string()));
}

#[tokio::test]
async fn test_bearish_news_produces_sell() {
    let snapshot = fxsignal::types::IndicatorSnapshot {
        rsi: 90.0,
        stoch: 95.0,
        macd: -0.0030,
        adx: 40.0,
        ..quiet(1.2700)
    };
    let mut h = Harness::new(
        test_config(&["GBPUSD"], Some(1), 1),
        ScriptedFeed::new(&[("GBPUSD", snapshot)]),
        MockSentiment::new(&[("GBPUSD", -6)]),
        MockAdvisor::new(10),
    );
    h.controller.run(std::future::pending()).await;

    let calls = h.advisor_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("GBPUSD".to_string(), Direction::Sell)]);

    let alert = &h.alerts()[0];
    assert_eq!(alert.direction, Direction::Sell);
    // 25 + 20 + 18 + 15 + 12 + 6 + 10
    assert_eq!(alert.score, 106);
}

async fn fetches_after(cycles: u64, refresh_every: u32) -> usize {
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(cycles), refresh_every),
        ScriptedFeed::new(&[]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    h.controller.run(std::future::pending()).await;
    h.fetches.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_news_refreshed_every_third_cycle() {
    assert_eq!(fetches_after(1, 3).await, 0);
    assert_eq!(fetches_after(2, 3).await, 0);
    assert_eq!(fetches_after(3, 3).await, 1);
    assert_eq!(fetches_after(5, 3).await, 1);
    // Cycles 3 and 6.
    assert_eq!(fetches_after(7, 3).await, 2);
}

#[tokio::test]
async fn test_early_cycles_score_without_news() {
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(3), 3),
        ScriptedFeed::new(&[("EURUSD", leaning_bullish(1.0862))]),
        MockSentiment::new(&[("EURUSD", 10)]),
        MockAdvisor::new(0),
    );
    let state = h.controller.run(std::future::pending()).await;

    let scores: Vec<(u32, &'static str)> = h
        .events()
        .iter()
        .filter_map(|e| match e {
            CycleEvent::PairScanned { buy_score, sentiment, .. } => Some((*buy_score, *sentiment)),
            _ => None,
        })
        .collect();
    // The batch arrives on cycle 3; only then does the +10 apply.
    assert_eq!(
        scores,
        vec![(45, "NEUTRAL"), (45, "NEUTRAL"), (55, "BULLISH")]
    );
    assert_eq!(state.max_score, 55);
}

#[tokio::test]
async fn test_news_refresh_every_cycle() {
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(4), 1),
        ScriptedFeed::new(&[]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    h.controller.run(std::future::pending()).await;
    assert_eq!(h.fetches.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_counters_accumulate_across_cycles() {
    let mut h = Harness::new(
        test_config(&["EURUSD", "GBPUSD"], Some(3), 3),
        ScriptedFeed::new(&[("EURUSD", bullish(1.0862)), ("GBPUSD", quiet(1.2750))]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    let state = h.controller.run(std::future::pending()).await;

    assert_eq!(state.cycles, 3);
    assert_eq!(state.signals, 3);
    assert_eq!(state.wins, 3);
    assert_eq!(h.feed_calls.load(Ordering::SeqCst), 6);

    let numbers: Vec<u64> = h.alerts().iter().map(|a| a.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let finished: Vec<(u64, usize, usize, u64)> = h
        .events()
        .iter()
        .filter_map(|e| match e {
            CycleEvent::CycleFinished {
                cycle,
                cycle_signals,
                pairs,
                total_signals,
                ..
            } => Some((*cycle, *cycle_signals, *pairs, *total_signals)),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![(1, 1, 2, 1), (2, 1, 2, 2), (3, 1, 2, 3)]);

    match h.events().last() {
        Some(CycleEvent::Shutdown { cycles, signals, wins }) => {
            assert_eq!((*cycles, *signals, *wins), (3, 3, 3));
        }
        other => panic!("expected shutdown last, got {other:?}"),
    }
}

#[tokio::test]
async fn test_immediate_shutdown_runs_no_cycle() {
    let mut h = Harness::new(
        test_config(&["EURUSD"], None, 3),
        ScriptedFeed::new(&[]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    let state = h.controller.run(async {}).await;

    assert_eq!(state.cycles, 0);
    assert_eq!(h.feed_calls.load(Ordering::SeqCst), 0);
    let events = h.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], CycleEvent::Started { .. }));
    assert!(matches!(
        events[1],
        CycleEvent::Shutdown { cycles: 0, signals: 0, wins: 0 }
    ));
}

/// Wakes the shutdown future once a given cycle has finished.
struct StopAfter {
    inner: RecordingSink,
    cycle: u64,
    notify: Arc<Notify>,
}

impl EventSink for StopAfter {
    fn emit(&mut self, event: &CycleEvent) {
        self.inner.emit(event);
        if let CycleEvent::CycleFinished { cycle, .. } = event {
            if *cycle == self.cycle {
                self.notify.notify_one();
            }
        }
    }
}

#[tokio::test]
async fn test_shutdown_between_cycles_without_limit() {
    let notify = Arc::new(Notify::new());
    let inner = RecordingSink::default();
    let events = Arc::clone(&inner.events);
    let sink = StopAfter {
        inner,
        cycle: 2,
        notify: Arc::clone(&notify),
    };

    let mut h = Harness::with_sink(
        test_config(&["EURUSD"], None, 3),
        ScriptedFeed::new(&[("EURUSD", bullish(1.0862))]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
        Box::new(sink),
        events,
    );

    let state = h
        .controller
        .run(async move { notify.notified().await })
        .await;

    assert_eq!(state.cycles, 2);
    assert_eq!(state.signals, 2);
    assert!(matches!(
        h.events().last(),
        Some(CycleEvent::Shutdown { cycles: 2, .. })
    ));
}

#[tokio::test]
async fn test_feed_moves_price_book() {
    let mut h = Harness::new(
        test_config(&["EURUSD", "GBPUSD"], Some(1), 3),
        ScriptedFeed::new(&[("EURUSD", quiet(1.0901))]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    assert_eq!(h.controller.prices().get("EURUSD"), Some(1.0850));

    h.controller.run(std::future::pending()).await;

    assert_eq!(h.controller.prices().get("EURUSD"), Some(1.0901));
    assert_eq!(h.controller.state().cycles, 1);
    // Unscripted pairs keep their seed.
    assert_eq!(h.controller.prices().get("GBPUSD"), Some(1.0850));
}

#[tokio::test]
async fn test_max_score_tracks_holds_too() {
    let mut h = Harness::new(
        test_config(&["EURUSD"], Some(1), 3),
        ScriptedFeed::new(&[("EURUSD", leaning_bullish(1.0862))]),
        MockSentiment::new(&[]),
        MockAdvisor::new(0),
    );
    let state = h.controller.run(std::future::pending()).await;
    assert_eq!(state.signals, 0);
    assert_eq!(state.max_score, 45);
}

#[test]
fn test_invalid_weights_rejected_at_construction() {
    let mut config = test_config(&["EURUSD"], Some(1), 3);
    config.weights.ai_confirm = 25;

    let result = CycleController::new(
        &config,
        Box::new(ScriptedFeed::new(&[])),
        Box::new(MockSentiment::new(&[])),
        Box::new(MockAdvisor::new(0)),
        Box::new(RecordingSink::default()),
    );
    assert!(matches!(
        result,
        Err(SignalError::InvalidWeights { total: 125, .. })
    ));
}

#[test]
fn test_threshold_above_max_rejected() {
    let mut config = test_config(&["EURUSD"], Some(1), 3);
    config.agent.threshold = 121;

    let result = CycleController::new(
        &config,
        Box::new(ScriptedFeed::new(&[])),
        Box::new(MockSentiment::new(&[])),
        Box::new(MockAdvisor::new(0)),
        Box::new(RecordingSink::default()),
    );
    assert!(matches!(result, Err(SignalError::Config(_))));
}
