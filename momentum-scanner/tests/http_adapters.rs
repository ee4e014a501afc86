//! HTTP adapter tests against a local mock server.

use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use momentum_scanner::data::{HistoricalDataProvider, HistoryRange, ProviderError, YahooChartProvider};
use momentum_scanner::screener::{ScreenerError, ScreenerQuery, ScreenerSource, TradingViewScreener};

// ============================================================================
// TradingView
// ============================================================================

fn screener_values(name: &str, close: f64) -> Vec<Value> {
    vec![
        json!(name),
        json!(close),
        json!(close * 0.95),
        json!(close * 0.9),
        json!(close * 0.85),
        json!(close * 0.98),
        json!(close * 1.05),
        json!(close * 0.6),
        json!(close * 1.05),
        json!(300_000),
        json!(200_000),
        json!(1.1),
        json!(5e10),
        json!("Finance"),
        Value::Null,
        json!(2.0),
        json!(12.0),
        json!(20.0),
        json!(35.0),
        json!(0.8),
        json!(true),
    ]
}

fn query() -> ScreenerQuery {
    ScreenerQuery {
        market: "india".into(),
        min_market_cap: 1e9,
        limit: 5000,
    }
}

#[tokio::test]
async fn test_tradingview_fetch_decodes_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/india/scan"))
        .and(body_partial_json(json!({
            "markets": ["india"],
            "sort": {"sortBy": "market_cap_basic", "sortOrder": "desc"},
            "range": [0, 5000]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": 2417,
            "data": [
                {"s": "NSE:HDFCBANK", "d": screener_values("HDFC Bank", 1650.0)},
                {"s": "BSE:M_M", "d": screener_values("Mahindra", 2900.0)}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let frame = TradingViewScreener::new(server.uri())
        .fetch(&query())
        .await
        .unwrap();

    assert_eq!(frame.total_count, 2417);
    assert_eq!(frame.rows.len(), 2);
    assert_eq!(frame.rows[0].exchange, "NSE");
    assert_eq!(frame.rows[0].symbol, "HDFCBANK");
    assert_eq!(frame.rows[0].close, Some(1650.0));
    assert_eq!(frame.rows[0].industry, None);
    assert_eq!(frame.rows[1].exchange, "BSE");
    assert_eq!(frame.rows[1].perf_1y, Some(35.0));
}

#[tokio::test]
async fn test_tradingview_schema_mismatch_fails_whole_fetch() {
    let server = MockServer::start().await;
    let mut short = screener_values("Broken", 10.0);
    short.truncate(5);

    Mock::given(method("POST"))
        .and(path("/india/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": 2,
            "data": [
                {"s": "NSE:GOOD", "d": screener_values("Good", 100.0)},
                {"s": "NSE:BROKEN", "d": short}
            ]
        })))
        .mount(&server)
        .await;

    let err = TradingViewScreener::new(server.uri())
        .fetch(&query())
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::Schema(_)));
}

#[tokio::test]
async fn test_tradingview_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = TradingViewScreener::new(server.uri())
        .fetch(&query())
        .await
        .unwrap_err();
    match err {
        ScreenerError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_tradingview_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let err = TradingViewScreener::new(server.uri())
        .fetch(&query())
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::Decode(_)));
}

// ============================================================================
// Yahoo
// ============================================================================

/// Midnight IST for `day` of October 2026, as a Unix timestamp.
fn ist_midnight(day: u32) -> i64 {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
        - 19_800
}

#[tokio::test]
async fn test_yahoo_daily_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/RELIANCE.NS"))
        .and(query_param("range", "6mo"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 19800},
                    "timestamp": [ist_midnight(14), ist_midnight(15), ist_midnight(16)],
                    "indicators": {"quote": [{
                        "open":   [2900.0, 2910.0, null],
                        "high":   [2950.0, 2960.0, 2990.0],
                        "low":    [2880.0, 2890.0, 2930.0],
                        "close":  [2920.0, 2940.0, 2985.0],
                        "volume": [5000000, 4200000, 6100000]
                    }]}
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let candles = YahooChartProvider::new(server.uri())
        .daily_history("RELIANCE.NS", HistoryRange::SixMonths)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].date, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
    assert_eq!(candles[1].date, NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
    assert_eq!(candles[1].close, 2940.0);
    assert_eq!(candles[1].volume, 4_200_000.0);
}

#[tokio::test]
async fn test_yahoo_unknown_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "chart": {"result": null, "error": {"code": "Not Found"}}
        })))
        .mount(&server)
        .await;

    let err = YahooChartProvider::new(server.uri())
        .daily_history("NOPE.NS", HistoryRange::SixMonths)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
}

#[tokio::test]
async fn test_yahoo_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
        })))
        .mount(&server)
        .await;

    let err = YahooChartProvider::new(server.uri())
        .daily_history("DELISTED.NS", HistoryRange::OneYear)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
}

#[tokio::test]
async fn test_yahoo_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = YahooChartProvider::new(server.uri())
        .daily_history("RELIANCE.NS", HistoryRange::SixMonths)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
}
