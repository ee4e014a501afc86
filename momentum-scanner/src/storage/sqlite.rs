//! SQLite-backed scan storage.
//!
//! Four tables: scan sessions, per-stock results, VCP patterns and breakout
//! alerts. Criterion flags and contraction depths are stored as JSON text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use momentum_common::config::StorageConfig;

use super::{
    BreakoutRecord, DashboardSummary, ResultRecord, ScanRecord, ScanStore, StoredPattern,
};
use crate::analysis::{BreakoutSignal, StockSnapshot, VcpPattern, VolumeTrend};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
-- Daily scan sessions
CREATE TABLE IF NOT EXISTS momentum_scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_date TEXT NOT NULL,
    scan_type TEXT NOT NULL DEFAULT 'trend_template',
    total_stocks_scanned INTEGER DEFAULT 0,
    qualifying_count INTEGER DEFAULT 0,
    scan_duration_sec REAL DEFAULT 0,
    error_message TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE(scan_date, scan_type)
);

CREATE INDEX IF NOT EXISTS idx_scans_date
ON momentum_scans(scan_date);

-- Per-stock results
CREATE TABLE IF NOT EXISTS momentum_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    exchange TEXT NOT NULL,
    company_name TEXT,
    close_price REAL,
    sma_50 REAL,
    sma_150 REAL,
    sma_200 REAL,
    ema_20 REAL,
    rs_rating REAL,
    pct_from_52w_high REAL,
    pct_from_52w_low REAL,
    high_52w REAL,
    low_52w REAL,
    volume REAL,
    avg_volume REAL,
    volume_ratio REAL,
    sector TEXT,
    industry TEXT,
    market_cap REAL,
    is_fno INTEGER DEFAULT 0,
    tradingview_link TEXT,
    passes_trend_template INTEGER DEFAULT 0,
    criteria_met INTEGER DEFAULT 0,
    tt_criteria_met TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (scan_id) REFERENCES momentum_scans(id)
);

CREATE INDEX IF NOT EXISTS idx_results_scan
ON momentum_results(scan_id);

CREATE INDEX IF NOT EXISTS idx_results_symbol
ON momentum_results(symbol);

-- VCP patterns
CREATE TABLE IF NOT EXISTS vcp_patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    detected_date TEXT NOT NULL,
    num_contractions INTEGER,
    contraction_depths TEXT,
    pivot_price REAL,
    current_price REAL,
    pct_from_pivot REAL,
    volume_trend TEXT,
    notation TEXT,
    base_duration_weeks INTEGER,
    final_contraction_depth REAL,
    ema_21 REAL,
    near_21ema INTEGER DEFAULT 0,
    has_inside_bar INTEGER DEFAULT 0,
    quality_score INTEGER DEFAULT 0,
    status TEXT DEFAULT 'active',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_vcp_symbol
ON vcp_patterns(symbol);

-- Breakout alerts
CREATE TABLE IF NOT EXISTS breakout_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    breakout_date TEXT NOT NULL,
    breakout_price REAL,
    volume_ratio REAL,
    suggested_stop REAL,
    risk_pct REAL,
    pattern_id INTEGER,
    status TEXT DEFAULT 'new',
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (pattern_id) REFERENCES vcp_patterns(id)
);

CREATE INDEX IF NOT EXISTS idx_breakout_date
ON breakout_alerts(breakout_date);
"#;

const UPSERT_SCAN_SQL: &str = r#"
INSERT INTO momentum_scans
    (scan_date, scan_type, total_stocks_scanned, qualifying_count, scan_duration_sec, error_message)
VALUES (?1, ?2, ?3, 0, 0, ?4)
ON CONFLICT(scan_date, scan_type) DO UPDATE SET
    total_stocks_scanned = excluded.total_stocks_scanned,
    qualifying_count = 0,
    scan_duration_sec = 0,
    error_message = excluded.error_message,
    created_at = datetime('now')
RETURNING id
"#;

const SCAN_COLUMNS: &str = "id, scan_date, scan_type, total_stocks_scanned, qualifying_count, \
     scan_duration_sec, error_message, created_at";

const PATTERN_COLUMNS: &str = "v.id, v.symbol, v.detected_date, v.num_contractions, \
     v.contraction_depths, v.pivot_price, v.current_price, v.pct_from_pivot, v.volume_trend, \
     v.notation, v.base_duration_weeks, v.final_contraction_depth, v.ema_21, v.near_21ema, \
     v.has_inside_bar, v.quality_score, v.status";

// ============================================================================
// Momentum Storage
// ============================================================================

/// SQLite store for scan sessions, results, patterns and breakouts.
pub struct MomentumStorage {
    /// rusqlite::Connection is Send but not Sync, so it sits behind a Mutex
    db: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl MomentumStorage {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open momentum database {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to set database pragmas")?;

        Self::init(conn, path)
    }

    /// Open from storage configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(config.resolved_db_path())
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create database tables")?;

        info!(db_path = %db_path.display(), "Initialized momentum storage");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn upsert_scan(
        &self,
        scan_date: NaiveDate,
        scan_type: &str,
        total_scanned: usize,
        error_message: Option<&str>,
    ) -> Result<i64> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let scan_id: i64 = tx.query_row(
            UPSERT_SCAN_SQL,
            params![
                scan_date.to_string(),
                scan_type,
                total_scanned as i64,
                error_message
            ],
            |row| row.get(0),
        )?;

        let dropped = tx.execute(
            "DELETE FROM momentum_results WHERE scan_id = ?1",
            params![scan_id],
        )?;

        tx.commit()?;

        if dropped > 0 {
            debug!(scan_id, dropped, "Replaced results of previous run");
        }
        Ok(scan_id)
    }

    // ========================================================================
    // Scan Queries
    // ========================================================================

    /// Most recent session of `scan_type`.
    pub async fn latest_scan(&self, scan_type: &str) -> Result<Option<ScanRecord>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM momentum_scans WHERE scan_type = ?1 \
             ORDER BY scan_date DESC, id DESC LIMIT 1",
            SCAN_COLUMNS
        );
        let scan = db
            .query_row(&sql, params![scan_type], Self::row_to_scan)
            .optional()?;
        Ok(scan)
    }

    /// Most recent `limit` sessions of any type.
    pub async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM momentum_scans ORDER BY scan_date DESC, id DESC LIMIT ?1",
            SCAN_COLUMNS
        );
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_scan)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Results of one session ordered by RS rating, optionally qualifiers only.
    pub async fn scan_results(&self, scan_id: i64, passes_only: bool) -> Result<Vec<ResultRecord>> {
        let db = self.db.lock().await;
        let mut sql = String::from(
            "SELECT id, scan_id, symbol, exchange, company_name, close_price, rs_rating, \
             pct_from_52w_high, pct_from_52w_low, volume_ratio, sector, industry, is_fno, \
             passes_trend_template, criteria_met, tt_criteria_met, tradingview_link \
             FROM momentum_results WHERE scan_id = ?1",
        );
        if passes_only {
            sql.push_str(" AND passes_trend_template = 1");
        }
        sql.push_str(" ORDER BY rs_rating DESC, id ASC");

        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map(params![scan_id], Self::row_to_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========================================================================
    // Pattern & Breakout Queries
    // ========================================================================

    /// Latest active pattern per symbol, best quality first, then closest
    /// to the pivot.
    pub async fn active_vcp_patterns(&self) -> Result<Vec<StoredPattern>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM vcp_patterns v \
             INNER JOIN ( \
                 SELECT symbol, MAX(id) AS max_id FROM vcp_patterns \
                 WHERE status = 'active' GROUP BY symbol \
             ) latest ON v.id = latest.max_id \
             ORDER BY v.quality_score DESC, v.pct_from_pivot ASC",
            PATTERN_COLUMNS
        );
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::row_to_pattern)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Breakouts on or after `since`, newest first.
    pub async fn recent_breakouts(&self, since: NaiveDate) -> Result<Vec<BreakoutRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT b.id, b.symbol, b.breakout_date, b.breakout_price, b.volume_ratio, \
             b.suggested_stop, b.risk_pct, b.pattern_id, b.status, v.notation, v.num_contractions \
             FROM breakout_alerts b \
             LEFT JOIN vcp_patterns v ON b.pattern_id = v.id \
             WHERE b.breakout_date >= ?1 \
             ORDER BY b.breakout_date DESC, b.id DESC",
        )?;
        let rows = stmt
            .query_map(params![since.to_string()], Self::row_to_breakout)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Headline numbers as of `as_of` (breakouts counted over the prior week).
    pub async fn dashboard_summary(&self, as_of: NaiveDate) -> Result<DashboardSummary> {
        let db = self.db.lock().await;

        let latest: Option<(i64, String, i64)> = db
            .query_row(
                "SELECT id, scan_date, total_stocks_scanned FROM momentum_scans \
                 ORDER BY scan_date DESC, id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let mut summary = DashboardSummary::default();

        if let Some((scan_id, scan_date, total)) = latest {
            summary.last_scan_date = Some(parse_date(1, &scan_date)?);
            summary.total_scanned = total.max(0) as usize;
            let qualifying: i64 = db.query_row(
                "SELECT COUNT(*) FROM momentum_results \
                 WHERE scan_id = ?1 AND passes_trend_template = 1",
                params![scan_id],
                |row| row.get(0),
            )?;
            summary.qualifying_count = qualifying as usize;
        }

        let active: i64 = db.query_row(
            "SELECT COUNT(DISTINCT symbol) FROM vcp_patterns WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;
        summary.active_vcp_count = active as usize;

        let since = as_of - Duration::days(7);
        let breakouts: i64 = db.query_row(
            "SELECT COUNT(*) FROM breakout_alerts WHERE breakout_date >= ?1",
            params![since.to_string()],
            |row| row.get(0),
        )?;
        summary.recent_breakouts = breakouts as usize;

        Ok(summary)
    }

    // ========================================================================
    // Row Mapping
    // ========================================================================

    fn row_to_scan(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
        let scan_date: String = row.get(1)?;
        let total: i64 = row.get(3)?;
        let qualifying: i64 = row.get(4)?;
        Ok(ScanRecord {
            id: row.get(0)?,
            scan_date: parse_date(1, &scan_date)?,
            scan_type: row.get(2)?,
            total_stocks_scanned: total.max(0) as usize,
            qualifying_count: qualifying.max(0) as usize,
            scan_duration_sec: row.get(5)?,
            error_message: row.get(6)?,
            created_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        })
    }

    fn row_to_result(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
        let criteria_json: Option<String> = row.get(15)?;
        let tt_criteria_met = match criteria_json {
            Some(raw) => parse_json::<BTreeMap<String, bool>>(15, &raw)?,
            None => BTreeMap::new(),
        };
        Ok(ResultRecord {
            id: row.get(0)?,
            scan_id: row.get(1)?,
            symbol: row.get(2)?,
            exchange: row.get(3)?,
            company_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            close_price: row.get(5)?,
            rs_rating: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            pct_from_52w_high: row.get(7)?,
            pct_from_52w_low: row.get(8)?,
            volume_ratio: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
            sector: row.get(10)?,
            industry: row.get(11)?,
            is_fno: row.get(12)?,
            passes_trend_template: row.get(13)?,
            criteria_met: row.get(14)?,
            tt_criteria_met,
            tradingview_link: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
        })
    }

    fn row_to_pattern(row: &Row<'_>) -> rusqlite::Result<StoredPattern> {
        let detected: String = row.get(2)?;
        let depths: Option<String> = row.get(4)?;
        let volume_trend: Option<String> = row.get(8)?;
        let num_contractions: i64 = row.get(3)?;
        let weeks: i64 = row.get(10)?;

        Ok(StoredPattern {
            id: row.get(0)?,
            pattern: VcpPattern {
                symbol: row.get(1)?,
                detected_date: parse_date(2, &detected)?,
                num_contractions: num_contractions.max(0) as usize,
                contraction_depths: match depths {
                    Some(raw) => parse_json(4, &raw)?,
                    None => Vec::new(),
                },
                pivot_price: row.get(5)?,
                current_price: row.get(6)?,
                pct_from_pivot: row.get(7)?,
                volume_trend: match volume_trend.as_deref() {
                    Some("declining") => VolumeTrend::Declining,
                    _ => VolumeTrend::Mixed,
                },
                notation: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                base_duration_weeks: weeks.max(0) as usize,
                final_contraction_depth: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
                ema_21: row.get(12)?,
                near_21ema: row.get(13)?,
                has_inside_bar: row.get(14)?,
                quality_score: row.get(15)?,
                status: row.get(16)?,
            },
        })
    }

    fn row_to_breakout(row: &Row<'_>) -> rusqlite::Result<BreakoutRecord> {
        let date: String = row.get(2)?;
        let num_contractions: Option<i64> = row.get(10)?;
        Ok(BreakoutRecord {
            id: row.get(0)?,
            signal: BreakoutSignal {
                symbol: row.get(1)?,
                breakout_date: parse_date(2, &date)?,
                breakout_price: row.get(3)?,
                volume_ratio: row.get(4)?,
                suggested_stop: row.get(5)?,
                risk_pct: row.get(6)?,
                pattern_id: row.get(7)?,
                status: row.get(8)?,
            },
            notation: row.get(9)?,
            num_contractions: num_contractions.map(|n| n.max(0) as usize),
        })
    }
}

// ============================================================================
// ScanStore Implementation
// ============================================================================

#[async_trait]
impl ScanStore for MomentumStorage {
    async fn create_scan(
        &self,
        scan_date: NaiveDate,
        scan_type: &str,
        total_scanned: usize,
    ) -> Result<i64> {
        let scan_id = self
            .upsert_scan(scan_date, scan_type, total_scanned, None)
            .await?;
        debug!(scan_id, %scan_date, scan_type, total_scanned, "Opened scan session");
        Ok(scan_id)
    }

    async fn record_failed_scan(
        &self,
        scan_date: NaiveDate,
        scan_type: &str,
        error_message: &str,
    ) -> Result<i64> {
        self.upsert_scan(scan_date, scan_type, 0, Some(error_message))
            .await
    }

    async fn save_results(&self, scan_id: i64, snapshots: &[StockSnapshot]) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO momentum_results
                (scan_id, symbol, exchange, company_name, close_price, sma_50, sma_150, sma_200,
                 ema_20, rs_rating, pct_from_52w_high, pct_from_52w_low, high_52w, low_52w,
                 volume, avg_volume, volume_ratio, sector, industry, market_cap, is_fno,
                 tradingview_link, passes_trend_template, criteria_met, tt_criteria_met)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                        ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)
                "#,
            )?;

            for snap in snapshots {
                stmt.execute(params![
                    scan_id,
                    snap.symbol,
                    snap.exchange,
                    snap.company_name,
                    snap.close,
                    snap.sma_50,
                    snap.sma_150,
                    snap.sma_200,
                    snap.ema_20,
                    snap.rs_rating,
                    snap.pct_below_high.map(|p| -p),
                    snap.pct_above_low,
                    snap.high_52w,
                    snap.low_52w,
                    snap.volume,
                    snap.avg_volume,
                    snap.volume_ratio,
                    snap.sector,
                    snap.industry,
                    snap.market_cap,
                    snap.is_fno,
                    snap.chart_link(),
                    snap.passes_trend_template,
                    snap.criteria_met,
                    criteria_json(snap)?,
                ])?;
            }
        }
        tx.commit()?;

        debug!(scan_id, count = snapshots.len(), "Saved scan results");
        Ok(snapshots.len())
    }

    async fn complete_scan(
        &self,
        scan_id: i64,
        qualifying_count: usize,
        duration_secs: f64,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE momentum_scans SET qualifying_count = ?1, scan_duration_sec = ?2 WHERE id = ?3",
            params![qualifying_count as i64, duration_secs, scan_id],
        )?;
        Ok(())
    }

    async fn save_vcp_pattern(&self, pattern: &VcpPattern) -> Result<i64> {
        let depths = serde_json::to_string(&pattern.contraction_depths)?;
        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT INTO vcp_patterns
            (symbol, detected_date, num_contractions, contraction_depths, pivot_price,
             current_price, pct_from_pivot, volume_trend, notation, base_duration_weeks,
             final_contraction_depth, ema_21, near_21ema, has_inside_bar, quality_score, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                pattern.symbol,
                pattern.detected_date.to_string(),
                pattern.num_contractions as i64,
                depths,
                pattern.pivot_price,
                pattern.current_price,
                pattern.pct_from_pivot,
                pattern.volume_trend.as_str(),
                pattern.notation,
                pattern.base_duration_weeks as i64,
                pattern.final_contraction_depth,
                pattern.ema_21,
                pattern.near_21ema,
                pattern.has_inside_bar,
                pattern.quality_score,
                pattern.status,
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn save_breakout(&self, signal: &BreakoutSignal) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT INTO breakout_alerts
            (symbol, breakout_date, breakout_price, volume_ratio, suggested_stop, risk_pct,
             pattern_id, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                signal.symbol,
                signal.breakout_date.to_string(),
                signal.breakout_price,
                signal.volume_ratio,
                signal.suggested_stop,
                signal.risk_pct,
                signal.pattern_id,
                signal.status,
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn prior_active_pattern(
        &self,
        symbol: &str,
        before: NaiveDate,
    ) -> Result<Option<StoredPattern>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM vcp_patterns v \
             WHERE v.symbol = ?1 AND v.status = 'active' AND v.detected_date < ?2 \
             ORDER BY v.detected_date DESC, v.id DESC LIMIT 1",
            PATTERN_COLUMNS
        );
        let pattern = db
            .query_row(&sql, params![symbol, before.to_string()], Self::row_to_pattern)
            .optional()?;
        Ok(pattern)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Criterion flags merged with the supplementary signals, as a JSON object.
fn criteria_json(snap: &StockSnapshot) -> Result<String> {
    let mut map: BTreeMap<String, bool> =
        serde_json::from_value(serde_json::to_value(snap.criteria)?)?;
    let signals: BTreeMap<String, bool> =
        serde_json::from_value(serde_json::to_value(snap.signals)?)?;
    map.extend(signals);
    Ok(serde_json::to_string(&map)?)
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
