//! Category weight table.
//!
//! Maps each scoring category to its point value. The categories must sum
//! to [`MAX_SCORE`]; a table that doesn't is rejected at startup.

use serde::Deserialize;

use crate::types::SignalError;

/// Maximum attainable score across all categories.
pub const MAX_SCORE: u32 = 120;

/// Category names in evaluation order.
pub const CATEGORIES: [&str; 7] = [
    "price_action",
    "rsi",
    "stoch_cci",
    "macd",
    "adx",
    "news_boost",
    "ai_confirm",
];

/// Point value per indicator category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub price_action: u32,
    pub rsi: u32,
    pub stoch_cci: u32,
    pub macd: u32,
    pub adx: u32,
    /// Ceiling of the news sentiment bonus in either direction.
    pub news_boost: u32,
    /// Ceiling of the advisory confirmation bonus.
    pub ai_confirm: u32,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            price_action: 25,
            rsi: 20,
            stoch_cci: 18,
            macd: 15,
            adx: 12,
            news_boost: 10,
            ai_confirm: 20,
        }
    }
}

impl WeightTable {
    /// Look up a category by name.
    pub fn get(&self, category: &str) -> Option<u32> {
        match category {
            "price_action" => Some(self.price_action),
            "rsi" => Some(self.rsi),
            "stoch_cci" => Some(self.stoch_cci),
            "macd" => Some(self.macd),
            "adx" => Some(self.adx),
            "news_boost" => Some(self.news_boost),
            "ai_confirm" => Some(self.ai_confirm),
            _ => None,
        }
    }

    /// `(category, points)` pairs in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        CATEGORIES
            .iter()
            .map(move |name| (*name, self.get(name).unwrap_or(0)))
    }

    pub fn total(&self) -> u32 {
        self.iter().map(|(_, points)| points).sum()
    }

    /// Reject tables whose categories don't add up to `MAX_SCORE`.
    pub fn validate(&self) -> Result<(), SignalError> {
        let total = self.total();
        if total != MAX_SCORE {
            return Err(SignalError::InvalidWeights {
                total,
                expected: MAX_SCORE,
            });
        }
        Ok(())
    }
}
