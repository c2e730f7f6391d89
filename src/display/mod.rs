//! Terminal presentation of controller events.
//!
//! Renders the banner, per-pair scan rows, alerts, cycle footers and the
//! countdown with ANSI colours. Formatting is kept in pure functions so it
//! can be checked without a terminal.

use chrono::Local;
use colored::Colorize;
use std::io::Write;

use crate::engine::events::{CycleEvent, EventSink, SignalAlert};
use crate::scoring::weights::MAX_SCORE;
use crate::types::{win_rate, Direction, IndicatorSnapshot};

const LINE_WIDTH: usize = 95;

/// Take profit and stop loss as multiples of ATR.
const TP_ATR_MULTIPLE: f64 = 1.2;
const SL_ATR_MULTIPLE: f64 = 0.8;

/// Headline and commentary are cut to this many characters in alerts.
const TEXT_WIDTH: usize = 70;

fn line_long() -> String {
    "=".repeat(LINE_WIDTH)
}

fn line_short() -> String {
    "-".repeat(LINE_WIDTH)
}

/// Truncate on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Take-profit and stop-loss distances in pips, rounded to 0.1.
pub fn targets(snapshot: &IndicatorSnapshot) -> (f64, f64) {
    let pips = snapshot.atr_pips();
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    (round1(pips * TP_ATR_MULTIPLE), round1(pips * SL_ATR_MULTIPLE))
}

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

pub fn format_banner(name: &str, pairs: &[String], threshold: u32, cycle_secs: u64) -> String {
    format!(
        "\n{}\n{}\n{}\n{}\n{}\n",
        format!("🔥 {name} | AI + NEWS EDITION 🔥").green().bold().underline(),
        line_long().cyan(),
        format!(
            "🦁 {} PAIRS | 12 INDICATORS | AI ANALYSIS | LIVE NEWS SENTIMENT 🦁",
            pairs.len()
        )
        .magenta(),
        format!("⚡ CYCLE: {cycle_secs}s | THRESHOLD: {threshold}pts | CLAUDE AI CONFIRMATION ⚡")
            .yellow(),
        line_long().cyan(),
    )
}

pub fn format_cycle_header(cycle: u64) -> String {
    let now = Local::now().format("%H:%M:%S");
    format!(
        "\n{}\n{}",
        format!("⏰ {now} | CYCLE #{cycle:03} | ELITE SWEEP").blue().bold(),
        line_short().cyan(),
    )
}

pub fn format_pair_row(pair: &str, snapshot: &IndicatorSnapshot, sentiment: &str) -> String {
    format!(
        "{}P:{:>8.5}  RSI:{:>4.1}  S:{:>4.1}  CCI:{:>5.0}  News:{:>8}  ",
        format!("🔥 {pair:<6}").cyan(),
        snapshot.price,
        snapshot.rsi,
        snapshot.stoch,
        snapshot.cci,
        sentiment,
    )
}

pub fn format_hold(buy_score: u32, sell_score: u32, max_score: u32) -> String {
    format!("⏳ HOLD  {:3}/{:3}", buy_score.max(sell_score), max_score)
        .bright_black()
        .to_string()
}

pub fn format_signal_label(direction: Direction, confidence: f64) -> String {
    match direction {
        Direction::Buy => format!("🟢 BUY  {confidence:2.0}% 🚀").green().bold().to_string(),
        _ => format!("🔴 SELL {confidence:2.0}% 💥").red().bold().to_string(),
    }
}

pub fn format_alert(alert: &SignalAlert) -> String {
    let s = &alert.snapshot;
    let (tp, sl) = targets(s);
    let emoji = if alert.direction == Direction::Buy { "🟢" } else { "🔴" };

    let title = format!(
        "🦁 ELITE SCALP #{} 🦁{emoji} {} {}",
        alert.number, alert.direction, alert.pair
    );
    let title = if alert.direction == Direction::Buy {
        title.green().bold().underline()
    } else {
        title.red().bold().underline()
    };

    let body = [
        line_long(),
        format!(
            "💰 ENTRY:      {:>9.5}  |  🎯 TP: {tp:>5.1} pips  |  🛡 SL: {sl:>5.1} pips",
            s.price
        ),
        format!(
            "📊 RSI:        {:>5.1}  |  STOCH: {:>5.1}  |  CCI: {:>6.0}",
            s.rsi, s.stoch, s.cci
        ),
        format!(
            "📈 EMA F/S:    {:>8.5} / {:>8.5}  |  MACD: {:+8.5}",
            s.ema_fast, s.ema_slow, s.macd
        ),
        format!(
            "⚡ ADX:        {:>5.1}  |  VOL: {:>5.2}x  |  ATR: {:>5.1}",
            s.adx,
            s.volume,
            s.atr_pips()
        ),
        format!(
            "💎 SCORE:      {:>4}/{MAX_SCORE}  |  CONFIDENCE: {:>3.0}%  |  STATS: {}/{}",
            alert.score, alert.confidence, alert.wins, alert.signals
        ),
        format!("🔥 TRIGGERS:   {}", alert.triggers.join(", ")),
        format!("📰 NEWS:       {}", truncate(&alert.headline, TEXT_WIDTH)),
        format!("🤖 AI TAKE:    {}", truncate(&alert.commentary, TEXT_WIDTH)),
        format!(
            "⏰ {}  |  🦁 ULTRA ELITE EXECUTION",
            Local::now().format("%H:%M:%S")
        ),
        line_long(),
    ]
    .join("\n");

    format!("\n{title}\n{}\n", body.bold())
}

pub fn format_cycle_footer(
    cycle: u64,
    cycle_signals: usize,
    pairs: usize,
    total_signals: u64,
    total_wins: u64,
    max_score: u32,
) -> String {
    format!(
        "\n{}\n{}\n{}",
        format!(
            "✅ CYCLE #{cycle} | {cycle_signals}/{pairs} SIGNALS | WR: {:5.1}%",
            win_rate(total_wins, total_signals)
        )
        .green()
        .bold(),
        format!("📊 TOTAL: {total_signals} signals | MAX SCORE: {max_score}/{MAX_SCORE}").magenta(),
        line_long().yellow(),
    )
}

pub fn format_countdown(seconds_left: u64, next_cycle: u64) -> String {
    format!("⏳ {seconds_left:2}s → CYCLE #{next_cycle}...")
        .yellow()
        .to_string()
}

pub fn format_shutdown(signals: u64, wins: u64) -> String {
    format!(
        "\n{}\n{}",
        "🛑 ULTRA ELITE STOPPED".red().bold(),
        format!(
            "📈 {signals} SIGNALS | {wins} WINS | {:5.1}% WR",
            win_rate(wins, signals)
        )
        .green()
        .bold(),
    )
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Prints controller events to stdout.
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TerminalDisplay {
    fn emit(&mut self, event: &CycleEvent) {
        match event {
            CycleEvent::Started { name, pairs, threshold, cycle_secs } => {
                println!("{}", format_banner(name, pairs, *threshold, *cycle_secs));
            }
            CycleEvent::CycleStarted { cycle } => println!("{}", format_cycle_header(*cycle)),
            CycleEvent::PairScanned { pair, snapshot, sentiment, .. } => {
                // The verdict is printed on the same line by the next event.
                print!("{}", format_pair_row(pair, snapshot, sentiment));
            }
            CycleEvent::Hold { buy_score, sell_score, max_score, .. } => {
                println!("{}", format_hold(*buy_score, *sell_score, *max_score));
            }
            CycleEvent::Signal(alert) => {
                println!("{}", format_signal_label(alert.direction, alert.confidence));
                println!("{}", format_alert(alert));
            }
            CycleEvent::CycleFinished {
                cycle,
                cycle_signals,
                pairs,
                total_signals,
                total_wins,
                max_score,
            } => println!(
                "{}",
                format_cycle_footer(
                    *cycle,
                    *cycle_signals,
                    *pairs,
                    *total_signals,
                    *total_wins,
                    *max_score
                )
            ),
            CycleEvent::Countdown { seconds_left, next_cycle } => {
                print!("\r{}", format_countdown(*seconds_left, *next_cycle));
                let _ = std::io::stdout().flush();
            }
            CycleEvent::Shutdown { signals, wins, .. } => {
                println!("{}", format_shutdown(*signals, *wins));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
