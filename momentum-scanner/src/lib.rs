//! Momentum Scanner Library
//!
//! Screens Indian equities against Minervini's Trend Template, ranks relative
//! strength, detects Volatility Contraction Patterns on the strongest names
//! and alerts on pivot breakouts. Output is advisory only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     momentum-scan (batch job)                       │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Screener       │→ │  Trend Template │→ │  VCP + Breakout │     │
//! │  │  (TradingView)  │  │  + RS ranking   │  │  (Yahoo candles)│     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! │                              ↓                                      │
//! │                     SQLite (momentum_tracker.db)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Trend Template
//! Eight criteria on moving-average alignment, distance from the 52-week
//! range and RS rating. A stock qualifies only when all eight hold.
//!
//! ## VCP
//! A base whose successive pullbacks get shallower, ideally on drying
//! volume. The pivot is the base's highest high.
//!
//! ## Breakout
//! A close above the pivot on at least 1.4× average volume.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analysis;
pub mod calendar;
pub mod data;
pub mod reference;
pub mod scan;
pub mod screener;
pub mod storage;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use momentum_common::config::Config;

pub use calendar::{MarketCalendar, SkipReason};
pub use scan::{ProgressEvent, ProgressSink, ReportFormat, ScanOrchestrator, ScanReport};
pub use storage::{MomentumStorage, ScanStore};

/// Result of asking the scanner to run for a date.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Not a trading day; nothing ran
    Skipped { date: NaiveDate, reason: SkipReason },
    Completed(ScanReport),
}

/// The configured scanner: storage, orchestrator and calendar guard.
pub struct MomentumScanner {
    config: Config,
    storage: Arc<MomentumStorage>,
    orchestrator: ScanOrchestrator,
    calendar: MarketCalendar,
}

impl MomentumScanner {
    /// Open storage and wire the HTTP adapters from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(
            MomentumStorage::from_config(&config.storage).context("Failed to open storage")?,
        );
        let orchestrator = ScanOrchestrator::from_config(&config, storage.clone())?;
        let calendar = MarketCalendar::new(&config.calendar);

        Ok(Self {
            config,
            storage,
            orchestrator,
            calendar,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Storage handle for dashboard-style reads.
    pub fn storage(&self) -> Arc<MomentumStorage> {
        Arc::clone(&self.storage)
    }

    /// Scan `date` unless it is a weekend or exchange holiday.
    pub async fn run_for(&self, date: NaiveDate, progress: &dyn ProgressSink) -> Result<ScanOutcome> {
        if let Some(reason) = self.calendar.skip_reason(date) {
            info!(%date, %reason, "Skipping scan");
            return Ok(ScanOutcome::Skipped { date, reason });
        }

        let report = self.orchestrator.run(date, progress).await?;
        Ok(ScanOutcome::Completed(report))
    }

    /// Scan today's exchange date.
    pub async fn run_today(&self, progress: &dyn ProgressSink) -> Result<ScanOutcome> {
        self.run_for(MarketCalendar::today(), progress).await
    }

    /// Write the report in every configured format. Nothing is written when
    /// local reports are disabled.
    pub fn save_reports(&self, report: &ScanReport) -> Result<Vec<PathBuf>> {
        let output = &self.config.output;
        if !output.local_report_enabled {
            return Ok(Vec::new());
        }

        let dir = output.resolved_report_dir();
        let mut saved = Vec::with_capacity(output.report_format.len());
        for name in &output.report_format {
            let format: ReportFormat = name.parse().map_err(|e: String| anyhow!(e))?;
            let path = report.save_to_file(&dir, format)?;
            info!(path = %path.display(), %format, "Saved scan report");
            saved.push(path);
        }
        Ok(saved)
    }
}
