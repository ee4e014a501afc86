//! Scan persistence.
//!
//! The orchestrator goes through the [`ScanStore`] trait; the dashboard
//! queries live on the concrete [`MomentumStorage`].

mod sqlite;

pub use sqlite::MomentumStorage;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::{BreakoutSignal, StockSnapshot, VcpPattern};

// ============================================================================
// Scan Store
// ============================================================================

/// Persistence contract used by the scan orchestrator.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Open (or reopen) the session for `(scan_date, scan_type)`.
    ///
    /// Reopening resets the summary and drops the session's previous result
    /// rows, so a rerun replaces rather than duplicates.
    async fn create_scan(
        &self,
        scan_date: NaiveDate,
        scan_type: &str,
        total_scanned: usize,
    ) -> Result<i64>;

    /// Record a session that failed before any stock was evaluated.
    async fn record_failed_scan(
        &self,
        scan_date: NaiveDate,
        scan_type: &str,
        error_message: &str,
    ) -> Result<i64>;

    /// Persist every evaluated snapshot in one batch.
    async fn save_results(&self, scan_id: i64, snapshots: &[StockSnapshot]) -> Result<usize>;

    /// Record the final qualifying count and duration.
    async fn complete_scan(
        &self,
        scan_id: i64,
        qualifying_count: usize,
        duration_secs: f64,
    ) -> Result<()>;

    /// Persist a detected pattern and return its id.
    async fn save_vcp_pattern(&self, pattern: &VcpPattern) -> Result<i64>;

    /// Persist a confirmed breakout and return its id.
    async fn save_breakout(&self, signal: &BreakoutSignal) -> Result<i64>;

    /// Latest active pattern for `symbol` detected strictly before `before`.
    async fn prior_active_pattern(
        &self,
        symbol: &str,
        before: NaiveDate,
    ) -> Result<Option<StoredPattern>>;
}

// ============================================================================
// Read Side Records
// ============================================================================

/// One scan session row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub scan_date: NaiveDate,
    pub scan_type: String,
    pub total_stocks_scanned: usize,
    pub qualifying_count: usize,
    pub scan_duration_sec: f64,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// One persisted snapshot, as the dashboard reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,
    pub scan_id: i64,
    pub symbol: String,
    pub exchange: String,
    pub company_name: String,
    pub close_price: Option<f64>,
    pub rs_rating: f64,
    /// Negative distance below the 52-week high, percent
    pub pct_from_52w_high: Option<f64>,
    pub pct_from_52w_low: Option<f64>,
    pub volume_ratio: f64,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub is_fno: bool,
    pub passes_trend_template: bool,
    pub criteria_met: u8,
    /// Criterion and signal flags keyed by name
    pub tt_criteria_met: BTreeMap<String, bool>,
    pub tradingview_link: String,
}

/// A persisted VCP pattern with its row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPattern {
    pub id: i64,
    #[serde(flatten)]
    pub pattern: VcpPattern,
}

/// A persisted breakout with the notation of the pattern it broke out of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutRecord {
    pub id: i64,
    #[serde(flatten)]
    pub signal: BreakoutSignal,
    pub notation: Option<String>,
    pub num_contractions: Option<usize>,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub last_scan_date: Option<NaiveDate>,
    pub total_scanned: usize,
    pub qualifying_count: usize,
    pub active_vcp_count: usize,
    pub recent_breakouts: usize,
}
