//! Historical data provider abstraction.
//!
//! Defines the `HistoricalDataProvider` trait the scan orchestrator fetches
//! daily candles through. Every error a provider returns means "skip this
//! symbol"; the scan itself carries on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Candle;

// ============================================================================
// History Range
// ============================================================================

/// Named lookback range for a daily history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl HistoryRange {
    /// Wire representation ("1mo", "3mo", "6mo", "1y").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
        }
    }
}

impl Default for HistoryRange {
    fn default() -> Self {
        Self::SixMonths
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            other => Err(format!("Unknown history range: {}", other)),
        }
    }
}

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to historical data providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded
    #[error("Rate limited")]
    RateLimited,

    /// Provider answered but had nothing for this ticker
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Short label used in skip logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::RateLimited => "rate_limited",
            Self::DataNotAvailable(_) => "not_available",
            Self::Parse(_) => "parse",
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Source of daily OHLCV history.
#[async_trait]
pub trait HistoricalDataProvider: Send + Sync {
    /// Provider name for logging (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch daily candles for a history ticker, oldest first.
    ///
    /// # Arguments
    /// * `ticker` - History ticker (e.g., "RELIANCE.NS")
    /// * `range` - Lookback range
    async fn daily_history(
        &self,
        ticker: &str,
        range: HistoryRange,
    ) -> Result<Vec<Candle>, ProviderError>;
}
