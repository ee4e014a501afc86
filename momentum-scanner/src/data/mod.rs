//! Historical market data for Indian equities.
//!
//! Provides the daily candle type, the provider abstraction the scan
//! orchestrator fetches history through, and the mapping from screener
//! symbols to history tickers.
//!
//! # Data Sources
//! - **Yahoo chart API** (default): daily OHLCV over a named range

mod provider;
mod symbols;
mod yahoo;

pub use provider::{HistoricalDataProvider, HistoryRange, ProviderError};
pub use symbols::{history_ticker, UNSUPPORTED_SUFFIXES};
pub use yahoo::YahooChartProvider;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume in shares
    pub volume: f64,
}

impl Candle {
    /// Whether this bar sits entirely inside `prior`.
    pub fn is_inside(&self, prior: &Candle) -> bool {
        self.high <= prior.high && self.low >= prior.low
    }
}
