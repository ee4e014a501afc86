//! Configuration management for the momentum scanner.
//!
//! The scanner reads a single JSON file at `~/.momentum/config.json`
//! (or the path in `MOMENTUM_CONFIG`). Every section is optional and falls
//! back to defaults that reproduce the daily NSE scan.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`MOMENTUM_*` prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `MOMENTUM_CONFIG` → config file path
//! - `MOMENTUM_LOG_LEVEL` → observability.log_level
//! - `MOMENTUM_LOG_FORMAT` → observability.log_format
//! - `MOMENTUM_DB_PATH` → storage.db_path

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".momentum"),
        |dirs| dirs.home_dir().join(".momentum"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var("MOMENTUM_CONFIG")
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .unwrap_or_else(|_| config_dir().join("config.json"))
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// SQLite persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pipeline-level settings (universe size, VCP phase, throttling)
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Trend Template thresholds
    #[serde(default)]
    pub trend_template: TrendTemplateConfig,

    /// VCP detector thresholds
    #[serde(default)]
    pub vcp: VcpConfig,

    /// Breakout detector thresholds
    #[serde(default)]
    pub breakout: BreakoutConfig,

    /// Reference data (F&O membership)
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// External data source endpoints
    #[serde(default)]
    pub data_sources: DataSourcesConfig,

    /// Exchange trading calendar
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Report files written after each scan
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str::<Self>(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("MOMENTUM_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("MOMENTUM_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(path) = std::env::var("MOMENTUM_DB_PATH") {
            self.storage.db_path = path;
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.observability.log_format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(Error::Config(format!(
                    "observability.log_format must be \"json\" or \"pretty\", got \"{other}\""
                )))
            }
        }

        if self.scanner.row_limit == 0 {
            return Err(Error::Config("scanner.row_limit must be positive".into()));
        }
        if self.scanner.min_market_cap < 0.0 {
            return Err(Error::Config("scanner.min_market_cap must not be negative".into()));
        }
        if self.scanner.throttle_every == 0 {
            return Err(Error::Config("scanner.throttle_every must be positive".into()));
        }
        if self.storage.db_path.trim().is_empty() {
            return Err(Error::Config("storage.db_path must not be empty".into()));
        }

        // 4 weeks × 5 days is the smallest window the detector accepts
        if self.vcp.lookback_weeks < 4 {
            return Err(Error::Config(format!(
                "vcp.lookback_weeks must be at least 4, got {}",
                self.vcp.lookback_weeks
            )));
        }
        if self.vcp.contraction_tolerance < 1.0 {
            return Err(Error::Config(
                "vcp.contraction_tolerance must be at least 1.0".into(),
            ));
        }

        if self.breakout.min_volume_ratio <= 0.0 {
            return Err(Error::Config("breakout.min_volume_ratio must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.breakout.stop_ratio) || self.breakout.stop_ratio == 0.0 {
            return Err(Error::Config(format!(
                "breakout.stop_ratio must be in (0, 1), got {}",
                self.breakout.stop_ratio
            )));
        }
        if self.breakout.avg_volume_window == 0 {
            return Err(Error::Config("breakout.avg_volume_window must be positive".into()));
        }

        if let Some(format) = self
            .output
            .report_format
            .iter()
            .find(|f| !matches!(f.to_lowercase().as_str(), "markdown" | "md" | "json"))
        {
            return Err(Error::Config(format!(
                "output.report_format entries must be \"markdown\" or \"json\", got \"{format}\""
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Storage
// ============================================================================

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; `~` is expanded
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

fn default_db_path() -> String {
    "~/.momentum/momentum_tracker.db".to_string()
}

// ============================================================================
// Scanner
// ============================================================================

/// Pipeline-level scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Scan type recorded on each session
    #[serde(default = "default_scan_type")]
    pub scan_type: String,

    /// Screener market (e.g., "india")
    #[serde(default = "default_market")]
    pub market: String,

    /// Minimum market cap in the screener's currency
    #[serde(default = "default_min_market_cap")]
    pub min_market_cap: f64,

    /// Maximum rows requested from the screener
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,

    /// Number of top-RS qualifying stocks checked for VCP
    #[serde(default = "default_vcp_top_n")]
    pub vcp_top_n: usize,

    /// History range requested per symbol ("1mo", "3mo", "6mo", "1y")
    #[serde(default = "default_history_range")]
    pub history_range: String,

    /// Histories shorter than this are skipped
    #[serde(default = "default_min_history_rows")]
    pub min_history_rows: usize,

    /// Insert a pause after this many symbols
    #[serde(default = "default_throttle_every")]
    pub throttle_every: usize,

    /// Pause length in milliseconds
    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_type: default_scan_type(),
            market: default_market(),
            min_market_cap: default_min_market_cap(),
            row_limit: default_row_limit(),
            vcp_top_n: default_vcp_top_n(),
            history_range: default_history_range(),
            min_history_rows: default_min_history_rows(),
            throttle_every: default_throttle_every(),
            throttle_delay_ms: default_throttle_delay_ms(),
        }
    }
}

fn default_scan_type() -> String {
    "trend_template".to_string()
}

fn default_market() -> String {
    "india".to_string()
}

fn default_min_market_cap() -> f64 {
    1_000_000_000.0
}

fn default_row_limit() -> usize {
    5000
}

fn default_vcp_top_n() -> usize {
    100
}

fn default_history_range() -> String {
    "6mo".to_string()
}

fn default_min_history_rows() -> usize {
    30
}

fn default_throttle_every() -> usize {
    10
}

fn default_throttle_delay_ms() -> u64 {
    500
}

// ============================================================================
// Trend Template
// ============================================================================

/// Thresholds for the Trend Template and its supplementary signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendTemplateConfig {
    /// Criterion 6: minimum % above the 52-week low
    #[serde(default = "default_min_pct_above_low")]
    pub min_pct_above_low: f64,

    /// Criterion 7: maximum % below the 52-week high
    #[serde(default = "default_max_pct_below_high")]
    pub max_pct_below_high: f64,

    /// Criterion 8: minimum RS rating
    #[serde(default = "default_min_rs_rating")]
    pub min_rs_rating: f64,

    /// Prior-uptrend pre-filter for VCP detection (% above 52-week low)
    #[serde(default = "default_strict_pct_above_low")]
    pub strict_pct_above_low: f64,

    /// Momentum burst: minimum daily change (%)
    #[serde(default = "default_burst_min_change_pct")]
    pub burst_min_change_pct: f64,

    /// Momentum burst: minimum relative volume
    #[serde(default = "default_burst_min_relative_volume")]
    pub burst_min_relative_volume: f64,

    /// Recent high: 6-month high must reach this fraction of the 52-week high
    #[serde(default = "default_recent_high_ratio")]
    pub recent_high_ratio: f64,

    /// Near-EMA signal: maximum distance from EMA20 (%)
    #[serde(default = "default_ema_proximity_pct")]
    pub ema_proximity_pct: f64,
}

impl Default for TrendTemplateConfig {
    fn default() -> Self {
        Self {
            min_pct_above_low: default_min_pct_above_low(),
            max_pct_below_high: default_max_pct_below_high(),
            min_rs_rating: default_min_rs_rating(),
            strict_pct_above_low: default_strict_pct_above_low(),
            burst_min_change_pct: default_burst_min_change_pct(),
            burst_min_relative_volume: default_burst_min_relative_volume(),
            recent_high_ratio: default_recent_high_ratio(),
            ema_proximity_pct: default_ema_proximity_pct(),
        }
    }
}

fn default_min_pct_above_low() -> f64 {
    30.0
}

fn default_max_pct_below_high() -> f64 {
    25.0
}

fn default_min_rs_rating() -> f64 {
    70.0
}

fn default_strict_pct_above_low() -> f64 {
    50.0
}

fn default_burst_min_change_pct() -> f64 {
    5.0
}

fn default_burst_min_relative_volume() -> f64 {
    2.0
}

fn default_recent_high_ratio() -> f64 {
    0.95
}

fn default_ema_proximity_pct() -> f64 {
    3.0
}

// ============================================================================
// VCP
// ============================================================================

/// Volatility Contraction Pattern detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcpConfig {
    /// Base length in weeks (5 trading days each)
    #[serde(default = "default_lookback_weeks")]
    pub lookback_weeks: usize,

    /// Each contraction must stay below previous × tolerance
    #[serde(default = "default_contraction_tolerance")]
    pub contraction_tolerance: f64,

    /// First contraction deeper than this is too volatile (%)
    #[serde(default = "default_max_first_depth")]
    pub max_first_depth: f64,

    /// Final contraction deeper than this is not tight yet (%)
    #[serde(default = "default_max_final_depth")]
    pub max_final_depth: f64,

    /// Final contraction at or below this earns a quality bonus (%)
    #[serde(default = "default_tight_final_depth")]
    pub tight_final_depth: f64,

    /// EMA period for the proximity check
    #[serde(default = "default_ema_period")]
    pub ema_period: usize,

    /// Near-EMA threshold (%)
    #[serde(default = "default_vcp_ema_proximity_pct")]
    pub ema_proximity_pct: f64,
}

impl Default for VcpConfig {
    fn default() -> Self {
        Self {
            lookback_weeks: default_lookback_weeks(),
            contraction_tolerance: default_contraction_tolerance(),
            max_first_depth: default_max_first_depth(),
            max_final_depth: default_max_final_depth(),
            tight_final_depth: default_tight_final_depth(),
            ema_period: default_ema_period(),
            ema_proximity_pct: default_vcp_ema_proximity_pct(),
        }
    }
}

fn default_lookback_weeks() -> usize {
    12
}

fn default_contraction_tolerance() -> f64 {
    1.1
}

fn default_max_first_depth() -> f64 {
    35.0
}

fn default_max_final_depth() -> f64 {
    15.0
}

fn default_tight_final_depth() -> f64 {
    8.0
}

fn default_ema_period() -> usize {
    21
}

fn default_vcp_ema_proximity_pct() -> f64 {
    5.0
}

// ============================================================================
// Breakout
// ============================================================================

/// Breakout detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    /// Minimum latest volume / average volume
    #[serde(default = "default_min_volume_ratio")]
    pub min_volume_ratio: f64,

    /// Suggested stop as a fraction of the pivot
    #[serde(default = "default_stop_ratio")]
    pub stop_ratio: f64,

    /// Bars used for the fallback average volume
    #[serde(default = "default_avg_volume_window")]
    pub avg_volume_window: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            min_volume_ratio: default_min_volume_ratio(),
            stop_ratio: default_stop_ratio(),
            avg_volume_window: default_avg_volume_window(),
        }
    }
}

fn default_min_volume_ratio() -> f64 {
    1.4
}

fn default_stop_ratio() -> f64 {
    0.92
}

fn default_avg_volume_window() -> usize {
    50
}

// ============================================================================
// Reference Data
// ============================================================================

/// Reference data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// F&O-eligible symbols (inline)
    #[serde(default = "default_fno_symbols")]
    pub fno_symbols: Vec<String>,

    /// Optional newline-separated file that replaces the inline list
    #[serde(default)]
    pub fno_symbols_file: Option<String>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            fno_symbols: default_fno_symbols(),
            fno_symbols_file: None,
        }
    }
}

/// NSE F&O universe used when no list is configured.
pub fn default_fno_symbols() -> Vec<String> {
    [
        "AARTIIND", "ABB", "ABBOTINDIA", "ABCAPITAL", "ABFRL", "ACC", "ADANIENT",
        "ADANIPORTS", "ALKEM", "AMBUJACEM", "APOLLOHOSP", "APOLLOTYRE", "ASHOKLEY",
        "ASIANPAINT", "ASTRAL", "ATUL", "AUBANK", "AUROPHARMA", "AXISBANK",
        "BAJAJ-AUTO", "BAJAJFINSV", "BAJFINANCE", "BALKRISIND", "BANDHANBNK",
        "BANKBARODA", "BATAINDIA", "BEL", "BERGEPAINT", "BHARATFORG", "BHARTIARTL",
        "BHEL", "BIOCON", "BOSCHLTD", "BPCL", "BRITANNIA", "BSOFT", "CANBK",
        "CANFINHOME", "CHAMBLFERT", "CHOLAFIN", "CIPLA", "COALINDIA", "COFORGE",
        "COLPAL", "CONCOR", "COROMANDEL", "CROMPTON", "CUB", "CUMMINS",
        "DABUR", "DALBHARAT", "DEEPAKNTR", "DELTACORP", "DIVISLAB", "DIXON",
        "DLF", "DRREDDY", "EICHERMOT", "ESCORTS", "EXIDEIND", "FEDERALBNK",
        "GAIL", "GLENMARK", "GMRINFRA", "GNFC", "GODREJCP", "GODREJPROP",
        "GRANULES", "GRASIM", "GUJGASLTD", "HAL", "HAVELLS", "HCLTECH",
        "HDFCAMC", "HDFCBANK", "HDFCLIFE", "HEROMOTOCO", "HINDALCO", "HINDCOPPER",
        "HINDPETRO", "HINDUNILVR", "ICICIBANK", "ICICIGI", "ICICIPRULI",
        "IDEA", "IDFC", "IDFCFIRSTB", "IEX", "IGL", "INDHOTEL", "INDIACEM",
        "INDIAMART", "INDIGO", "INDUSINDBK", "INDUSTOWER", "INFY", "IOC",
        "IPCALAB", "IRCTC", "ITC", "JINDALSTEL", "JKCEMENT", "JSWSTEEL",
        "JUBLFOOD", "KOTAKBANK", "LALPATHLAB", "LAURUSLABS", "LICHSGFIN",
        "LICI", "LT", "LTIM", "LTTS", "LUPIN", "M&M", "MANAPPURAM",
        "MARICO", "MARUTI", "MCX", "METROPOLIS", "MFSL", "MGL", "MOTHERSON",
        "MPHASIS", "MRF", "MUTHOOTFIN", "NATIONALUM", "NAUKRI", "NAVINFLUOR",
        "NESTLEIND", "NMDC", "NTPC", "OBEROIRLTY", "OFSS", "ONGC", "PAGEIND",
        "PEL", "PERSISTENT", "PETRONET", "PFC", "PIDGENINDS", "PIIND", "PNB",
        "POLYCAB", "POWERGRID", "PVRINOX", "RAMCOCEM", "RBLBANK", "RECLTD",
        "RELIANCE", "SAIL", "SBICARD", "SBILIFE", "SBIN", "SHREECEM",
        "SHRIRAMFIN", "SIEMENS", "SRF", "SUNPHARMA", "SUNTV", "SYNGENE",
        "TATACHEM", "TATACOMM", "TATACONSUM", "TATAELXSI", "TATAMOTORS",
        "TATAPOWER", "TATASTEEL", "TCS", "TECHM", "TITAN", "TORNTPHARM",
        "TRENT", "TVSMOTOR", "UBL", "ULTRACEMCO", "UNIONBANK", "UNITDSPR",
        "UPL", "VEDL", "VOLTAS", "WIPRO", "ZYDUSLIFE",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ============================================================================
// Data Sources
// ============================================================================

/// External endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourcesConfig {
    /// Bulk screener base URL
    #[serde(default = "default_screener_base_url")]
    pub screener_base_url: String,

    /// Daily chart base URL
    #[serde(default = "default_history_base_url")]
    pub history_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent to both sources
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DataSourcesConfig {
    fn default() -> Self {
        Self {
            screener_base_url: default_screener_base_url(),
            history_base_url: default_history_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_screener_base_url() -> String {
    "https://scanner.tradingview.com".to_string()
}

fn default_history_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) momentum-scanner".to_string()
}

// ============================================================================
// Output
// ============================================================================

/// Local report file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Whether to save local report files
    #[serde(default)]
    pub local_report_enabled: bool,

    /// Directory for local reports; `~` is expanded
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Report formats to generate ("markdown", "json")
    #[serde(default = "default_report_formats")]
    pub report_format: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_report_enabled: false,
            report_dir: default_report_dir(),
            report_format: default_report_formats(),
        }
    }
}

impl OutputConfig {
    /// Report directory with `~` expanded.
    pub fn resolved_report_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.report_dir).into_owned())
    }
}

fn default_report_dir() -> String {
    "~/.momentum/reports".to_string()
}

fn default_report_formats() -> Vec<String> {
    vec!["markdown".to_string(), "json".to_string()]
}

// ============================================================================
// Calendar
// ============================================================================

/// Exchange calendar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Skip Saturdays and Sundays
    #[serde(default = "default_true")]
    pub skip_weekends: bool,

    /// Exchange holidays (YYYY-MM-DD)
    #[serde(default = "default_holidays")]
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            skip_weekends: true,
            holidays: default_holidays(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// NSE holidays for 2026. Several lunar dates are tentative.
pub fn default_holidays() -> Vec<NaiveDate> {
    [
        (1, 26),
        (2, 17),
        (3, 10),
        (3, 30),
        (4, 2),
        (4, 3),
        (4, 14),
        (5, 1),
        (5, 25),
        (6, 5),
        (7, 6),
        (8, 15),
        (8, 19),
        (9, 4),
        (10, 2),
        (10, 20),
        (11, 9),
        (11, 10),
        (11, 27),
        (12, 25),
    ]
    .iter()
    .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(2026, m, d))
    .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scanner.row_limit, 5000);
        assert_eq!(config.scanner.vcp_top_n, 100);
        assert_eq!(config.scanner.scan_type, "trend_template");
        assert!((config.trend_template.min_rs_rating - 70.0).abs() < 1e-9);
        assert_eq!(config.vcp.lookback_weeks, 12);
        assert!((config.breakout.stop_ratio - 0.92).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "scanner": { "vcp_top_n": 25 },
            "calendar": { "holidays": ["2026-10-02"] }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scanner.vcp_top_n, 25);
        assert_eq!(config.scanner.row_limit, 5000);
        assert_eq!(config.calendar.holidays.len(), 1);
        assert!(config.calendar.skip_weekends);
        assert!(config.reference.fno_symbols.contains(&"RELIANCE".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scanner.row_limit = 0;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = Config::default();
        config.breakout.stop_ratio = 1.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.vcp.lookback_weeks = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.observability.log_format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_defaults_and_format_check() {
        let config = Config::default();
        assert!(!config.output.local_report_enabled);
        assert_eq!(config.output.report_format, vec!["markdown", "json"]);
        assert!(!config
            .output
            .resolved_report_dir()
            .to_string_lossy()
            .starts_with('~'));

        let mut config = Config::default();
        config.output.report_format = vec!["md".into(), "telegram".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("telegram"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"observability": {"level": "debug"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config"));
        match err {
            Error::WithContext { source, .. } => assert!(matches!(*source, Error::Json(_))),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = Config::load_from(&path).unwrap_err();
        assert!(!err.is_config());
        match err {
            Error::WithContext { source, .. } => assert!(matches!(*source, Error::Io(_))),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolved_db_path_expands_tilde() {
        let storage = StorageConfig {
            db_path: "/tmp/momentum.db".into(),
        };
        assert_eq!(storage.resolved_db_path(), PathBuf::from("/tmp/momentum.db"));

        let storage = StorageConfig::default();
        assert!(!storage.resolved_db_path().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_default_holidays() {
        let holidays = default_holidays();
        assert_eq!(holidays.len(), 20);
        assert!(holidays.contains(&NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()));
    }
}
