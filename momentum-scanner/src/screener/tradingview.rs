//! TradingView scanner adapter.
//!
//! # Endpoint
//! `POST {base}/{market}/scan`
//!
//! One request returns every primary listing above the market-cap floor with
//! the indicator columns in [`SCREENER_COLUMNS`] order. Rows come back as
//! `{"s": "NSE:RELIANCE", "d": [...]}` with `d` aligned to the columns.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use momentum_common::config::DataSourcesConfig;

use super::query::{
    split_ticker, ScreenerError, ScreenerFrame, ScreenerQuery, ScreenerRow, ScreenerSource,
    SCREENER_COLUMNS,
};

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

static NULL: Value = Value::Null;

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(rename = "totalCount", default)]
    total_count: usize,
    #[serde(default)]
    data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    s: String,
    d: Vec<Value>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Bulk screener over the TradingView scanner endpoint.
pub struct TradingViewScreener {
    client: reqwest::Client,
    base_url: String,
}

impl TradingViewScreener {
    /// Create an adapter against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_options(base_url, DEFAULT_TIMEOUT_SECS, None)
    }

    /// Create with an explicit timeout and User-Agent.
    pub fn with_options(
        base_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: Option<&str>,
    ) -> Self {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &DataSourcesConfig) -> Self {
        Self::with_options(
            &config.screener_base_url,
            config.request_timeout_secs,
            Some(&config.user_agent),
        )
    }

    /// Request body for one bulk query.
    pub fn request_body(query: &ScreenerQuery) -> Value {
        json!({
            "filter": [
                {"left": "market_cap_basic", "operation": "greater", "right": query.min_market_cap},
                {"left": "is_primary", "operation": "equal", "right": true}
            ],
            "markets": [query.market],
            "columns": SCREENER_COLUMNS,
            "sort": {"sortBy": "market_cap_basic", "sortOrder": "desc"},
            "range": [0, query.limit],
            "options": {"lang": "en"}
        })
    }
}

#[async_trait]
impl ScreenerSource for TradingViewScreener {
    fn name(&self) -> &'static str {
        "tradingview"
    }

    async fn fetch(&self, query: &ScreenerQuery) -> Result<ScreenerFrame, ScreenerError> {
        let url = format!("{}/{}/scan", self.base_url, query.market);
        debug!(url = %url, limit = query.limit, "Querying screener");

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(query))
            .send()
            .await
            .map_err(|e| ScreenerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreenerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ScanResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::Decode(e.to_string()))?;

        let rows = body
            .data
            .iter()
            .map(|raw| decode_row(&raw.s, &raw.d))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            rows = rows.len(),
            total = body.total_count,
            market = %query.market,
            "Screener fetch complete"
        );

        Ok(ScreenerFrame {
            total_count: body.total_count,
            rows,
        })
    }
}

// ============================================================================
// Row Decoding
// ============================================================================

/// Positional view over one row's values.
struct RowValues<'a> {
    ticker: &'a str,
    values: &'a [Value],
}

impl<'a> RowValues<'a> {
    fn get(&self, column: &str) -> &'a Value {
        SCREENER_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&NULL)
    }

    fn mismatch(&self, column: &str, expected: &str, got: &Value) -> ScreenerError {
        ScreenerError::Schema(format!(
            "{}: column {} expected {}, got {}",
            self.ticker, column, expected, got
        ))
    }

    fn number(&self, column: &str) -> Result<Option<f64>, ScreenerError> {
        match self.get(column) {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            other => Err(self.mismatch(column, "number", other)),
        }
    }

    fn text(&self, column: &str) -> Result<Option<String>, ScreenerError> {
        match self.get(column) {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Err(self.mismatch(column, "string", other)),
        }
    }

    fn flag(&self, column: &str) -> Result<Option<bool>, ScreenerError> {
        match self.get(column) {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            other => Err(self.mismatch(column, "bool", other)),
        }
    }
}

/// Decode one positional row. Any shape or type mismatch fails the fetch.
pub fn decode_row(ticker: &str, values: &[Value]) -> Result<ScreenerRow, ScreenerError> {
    if values.len() != SCREENER_COLUMNS.len() {
        return Err(ScreenerError::Schema(format!(
            "{}: expected {} values, got {}",
            ticker,
            SCREENER_COLUMNS.len(),
            values.len()
        )));
    }

    let (exchange, symbol) = split_ticker(ticker)?;
    let row = RowValues { ticker, values };

    Ok(ScreenerRow {
        exchange,
        symbol,
        name: row.text("name")?,
        close: row.number("close")?,
        sma50: row.number("SMA50")?,
        sma150: row.number("SMA150")?,
        sma200: row.number("SMA200")?,
        ema20: row.number("EMA20")?,
        high_52w: row.number("price_52_week_high")?,
        low_52w: row.number("price_52_week_low")?,
        high_6m: row.number("High.6M")?,
        volume: row.number("volume")?,
        avg_volume_30d: row.number("average_volume_30d_calc")?,
        relative_volume_10d: row.number("relative_volume_10d_calc")?,
        market_cap: row.number("market_cap_basic")?,
        sector: row.text("sector")?,
        industry: row.text("industry")?,
        perf_1m: row.number("Perf.1M")?,
        perf_3m: row.number("Perf.3M")?,
        perf_6m: row.number("Perf.6M")?,
        perf_1y: row.number("Perf.Y")?,
        change_pct: row.number("change")?,
        is_primary: row.flag("is_primary")?,
    })
}
