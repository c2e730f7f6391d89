//! Market data collaborators.
//!
//! Defines the `SnapshotProvider` and `SentimentSource` traits consumed by
//! the cycle controller, plus the simulated indicator feed and the NewsAPI
//! sentiment client. Implementations absorb their own failures: callers
//! always get a usable value back.

pub mod news;
pub mod simulated;

use async_trait::async_trait;

use crate::types::{Headline, IndicatorSnapshot, PriceBook, SentimentReading};

/// Source of per-pair indicator snapshots.
///
/// Implementors own how indicators are computed and may move the pair's
/// price in `prices` as a side effect. `compute` must always return a
/// complete snapshot.
#[async_trait]
pub trait SnapshotProvider: Send {
    async fn compute(&mut self, pair: &str, prices: &mut PriceBook) -> IndicatorSnapshot;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

/// Turns a batch of headlines into a bounded per-pair bonus.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Pull the latest headline batch. Falls back to a built-in batch on failure.
    async fn fetch_batch(&self) -> Vec<Headline>;

    /// Bonus in [-10, 10] and the most representative headline for `pair`.
    /// Returns `(0, "no relevant headlines")` when nothing in `batch` applies.
    fn bonus_for(&self, pair: &str, batch: &[Headline]) -> SentimentReading;
}
