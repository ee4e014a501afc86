//! Yahoo chart API adapter for daily NSE/BSE history.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{ticker}?range=6mo&interval=1d`
//!
//! Timestamps, opens, highs, lows, closes and volumes arrive as parallel
//! arrays. Bars with any missing field are dropped.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use momentum_common::config::DataSourcesConfig;

use super::provider::{HistoricalDataProvider, HistoryRange, ProviderError};
use super::Candle;

// ============================================================================
// Constants
// ============================================================================

/// Chart endpoint path
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds (19800 for IST)
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Daily history from the Yahoo chart API.
pub struct YahooChartProvider {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL without trailing slash
    base_url: String,
}

impl YahooChartProvider {
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
            &config.history_base_url,
            config.request_timeout_secs,
            Some(&config.user_agent),
        )
    }

    /// Turn the parallel arrays into candles, oldest first.
    fn parse_result(ticker: &str, result: ChartResult) -> Result<Vec<Candle>, ProviderError> {
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse(format!("{}: missing quote block", ticker)))?;
        let offset = result.meta.map(|m| m.gmt_offset).unwrap_or(0);

        let mut candles = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
                field(&quote.volume),
            ) else {
                continue;
            };

            let date = DateTime::from_timestamp(*ts, 0)
                .map(|dt| (dt + ChronoDuration::seconds(offset)).date_naive())
                .ok_or_else(|| ProviderError::Parse(format!("invalid timestamp {}", ts)))?;

            candles.push(Candle {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        candles.sort_by_key(|c| c.date);
        Ok(candles)
    }
}

#[async_trait]
impl HistoricalDataProvider for YahooChartProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn daily_history(
        &self,
        ticker: &str,
        range: HistoryRange,
    ) -> Result<Vec<Candle>, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, CHART_ENDPOINT, ticker);

        debug!(ticker, range = %range, "Fetching daily history");

        let response = self
            .client
            .get(&url)
            .query(&[("range", range.as_str()), ("interval", "1d")])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::DataNotAvailable(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Network(format!("HTTP {} for {}", status, ticker)));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {}", e)))?;

        if let Some(err) = body.chart.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::DataNotAvailable(format!("{}: {}", ticker, err)));
        }

        let result = body
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ProviderError::DataNotAvailable(ticker.to_string()))?;

        let candles = Self::parse_result(ticker, result)?;
        if candles.is_empty() {
            return Err(ProviderError::DataNotAvailable(format!("{}: empty history", ticker)));
        }

        Ok(candles)
    }
}
