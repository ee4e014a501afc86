//! Bulk screener query types and the source abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use momentum_common::config::ScannerConfig;

/// Screener columns requested on every query, in wire order.
///
/// Row decoding maps values positionally onto this list, so the two must
/// stay in step.
pub const SCREENER_COLUMNS: &[&str] = &[
    "name",
    "close",
    "SMA50",
    "SMA150",
    "SMA200",
    "EMA20",
    "price_52_week_high",
    "price_52_week_low",
    "High.6M",
    "volume",
    "average_volume_30d_calc",
    "relative_volume_10d_calc",
    "market_cap_basic",
    "sector",
    "industry",
    "Perf.1M",
    "Perf.3M",
    "Perf.6M",
    "Perf.Y",
    "change",
    "is_primary",
];

// ============================================================================
// Query
// ============================================================================

/// One bulk screener request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerQuery {
    /// Screener market (e.g., "india")
    pub market: String,
    /// Exclusive lower bound on market cap
    pub min_market_cap: f64,
    /// Maximum rows returned
    pub limit: usize,
}

impl ScreenerQuery {
    /// Build the query from scanner configuration.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            market: config.market.clone(),
            min_market_cap: config.min_market_cap,
            limit: config.row_limit,
        }
    }
}

impl Default for ScreenerQuery {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One normalised screener row. Every metric is optional; a missing value
/// stays `None` all the way to evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRow {
    /// Exchange code (e.g., "NSE")
    pub exchange: String,
    /// Exchange symbol (e.g., "RELIANCE")
    pub symbol: String,
    pub name: Option<String>,
    pub close: Option<f64>,
    pub sma50: Option<f64>,
    pub sma150: Option<f64>,
    pub sma200: Option<f64>,
    pub ema20: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub high_6m: Option<f64>,
    pub volume: Option<f64>,
    pub avg_volume_30d: Option<f64>,
    pub relative_volume_10d: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub perf_1m: Option<f64>,
    pub perf_3m: Option<f64>,
    pub perf_6m: Option<f64>,
    pub perf_1y: Option<f64>,
    /// Today's change in percent
    pub change_pct: Option<f64>,
    pub is_primary: Option<bool>,
}

/// Result of one screener fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenerFrame {
    /// Matches reported by the source (may exceed `rows.len()`)
    pub total_count: usize,
    /// Rows ordered by market cap descending
    pub rows: Vec<ScreenerRow>,
}

// ============================================================================
// Errors
// ============================================================================

/// Screener failures. Every variant is scan-fatal.
#[derive(Debug, Error)]
pub enum ScreenerError {
    /// Connection, timeout or TLS failure
    #[error("Screener transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("Screener returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON envelope
    #[error("Screener response could not be decoded: {0}")]
    Decode(String),

    /// A row did not match the requested column list
    #[error("Screener schema mismatch: {0}")]
    Schema(String),
}

// ============================================================================
// Source Trait
// ============================================================================

/// Market-wide screening source.
#[async_trait]
pub trait ScreenerSource: Send + Sync {
    /// Source name for logging (e.g., "tradingview")
    fn name(&self) -> &'static str;

    /// Run one bulk query.
    async fn fetch(&self, query: &ScreenerQuery) -> Result<ScreenerFrame, ScreenerError>;
}

/// Split an `"EXCHANGE:SYMBOL"` ticker.
pub fn split_ticker(ticker: &str) -> Result<(String, String), ScreenerError> {
    match ticker.split_once(':') {
        Some((exchange, symbol)) if !exchange.is_empty() && !symbol.is_empty() => {
            Ok((exchange.to_string(), symbol.to_string()))
        }
        _ => Err(ScreenerError::Schema(format!("malformed ticker \"{}\"", ticker))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ticker() {
        let (exchange, symbol) = split_ticker("NSE:RELIANCE").unwrap();
        assert_eq!(exchange, "NSE");
        assert_eq!(symbol, "RELIANCE");

        let (_, symbol) = split_ticker("BSE:M&M").unwrap();
        assert_eq!(symbol, "M&M");
    }

    #[test]
    fn test_split_ticker_malformed() {
        for bad in ["RELIANCE", ":RELIANCE", "NSE:", ""] {
            assert!(matches!(split_ticker(bad), Err(ScreenerError::Schema(_))), "{bad}");
        }
    }

    #[test]
    fn test_query_from_default_config() {
        let query = ScreenerQuery::default();
        assert_eq!(query.market, "india");
        assert_eq!(query.limit, 5000);
        assert!((query.min_market_cap - 1_000_000_000.0).abs() < 1e-3);
    }
}
