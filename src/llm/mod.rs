//! LLM integration for qualitative signal confirmation.
//!
//! Defines the `AdvisorySource` trait and the Claude (Anthropic)
//! implementation used to second-guess a technical direction bias.

pub mod anthropic;

use async_trait::async_trait;

use crate::types::{Advisory, Direction, IndicatorSnapshot};

/// Abstraction over advisory models.
///
/// Implementors ask a model whether the technical picture and the news
/// support `bias`, and return a confirmation bonus in [0, 20] with a short
/// commentary. Transport, rate-limit and parse failures must be absorbed
/// into a bounded neutral response; `confirm` never fails.
#[async_trait]
pub trait AdvisorySource: Send + Sync {
    async fn confirm(
        &self,
        pair: &str,
        snapshot: &IndicatorSnapshot,
        bias: Direction,
        headline: &str,
    ) -> Advisory;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

/// Lets a caller keep a handle on an advisor (for its call and cost
/// counters) while the controller owns another.
#[async_trait]
impl<T: AdvisorySource + ?Sized> AdvisorySource for std::sync::Arc<T> {
    async fn confirm(
        &self,
        pair: &str,
        snapshot: &IndicatorSnapshot,
        bias: Direction,
        headline: &str,
    ) -> Advisory {
        (**self).confirm(pair, snapshot, bias, headline).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
