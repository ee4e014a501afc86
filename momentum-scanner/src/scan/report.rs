//! Scan report and rendering.
//!
//! The report is what the orchestrator hands back to its caller. It renders
//! to:
//! - a plain-text summary (for the CLI)
//! - Markdown (for sharing)
//! - JSON (for programmatic use)

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::analysis::{BreakoutSignal, StockSnapshot, VcpPattern};

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension for saved reports.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Funnel
// ============================================================================

/// Pass/eliminate counts for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    pub passed: usize,
    pub eliminated: usize,
    /// Percent of the stage's input that was eliminated
    pub elimination_rate: f64,
}

impl FunnelStage {
    pub fn new(stage: impl Into<String>, input_count: usize, passed_count: usize) -> Self {
        let eliminated = input_count.saturating_sub(passed_count);
        let elimination_rate = if input_count > 0 {
            (eliminated as f64 / input_count as f64) * 100.0
        } else {
            0.0
        };

        Self {
            stage: stage.into(),
            passed: passed_count,
            eliminated,
            elimination_rate,
        }
    }
}

// ============================================================================
// Scan Report
// ============================================================================

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: i64,
    pub scan_date: NaiveDate,
    pub total_scanned: usize,
    /// Skipped symbols, or 1 for a scan-fatal failure
    pub errors: usize,
    pub qualifying_count: usize,
    /// Trend Template qualifiers, highest RS first
    pub qualifying: Vec<StockSnapshot>,
    /// VCP candidates examined
    pub vcp_checked: usize,
    pub vcp_candidates: Vec<VcpPattern>,
    pub breakouts: Vec<BreakoutSignal>,
    pub duration_secs: f64,
    pub error_message: Option<String>,
}

impl ScanReport {
    /// Report for a scan that aborted before evaluation.
    pub fn failed(
        scan_id: i64,
        scan_date: NaiveDate,
        duration_secs: f64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            scan_id,
            scan_date,
            total_scanned: 0,
            errors: 1,
            qualifying_count: 0,
            qualifying: Vec::new(),
            vcp_checked: 0,
            vcp_candidates: Vec::new(),
            breakouts: Vec::new(),
            duration_secs,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error_message.is_some()
    }

    /// Top `n` qualifying stocks.
    pub fn top(&self, n: usize) -> &[StockSnapshot] {
        &self.qualifying[..n.min(self.qualifying.len())]
    }

    /// Stage-by-stage counts from the screened universe to breakouts.
    pub fn funnel(&self) -> Vec<FunnelStage> {
        vec![
            FunnelStage::new("Trend Template", self.total_scanned, self.qualifying_count),
            FunnelStage::new("VCP checked", self.qualifying_count, self.vcp_checked),
            FunnelStage::new("VCP detected", self.vcp_checked, self.vcp_candidates.len()),
            FunnelStage::new("Breakout", self.vcp_candidates.len(), self.breakouts.len()),
        ]
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        match &self.error_message {
            Some(error) => format!("Scan {} failed: {}", self.scan_date, error),
            None => format!(
                "Scanned {} stocks in {:.1}s: {} qualifying, {} VCP, {} breakouts, {} errors",
                self.total_scanned,
                self.duration_secs,
                self.qualifying_count,
                self.vcp_candidates.len(),
                self.breakouts.len(),
                self.errors
            ),
        }
    }

    /// Multi-line console summary.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Stocks scanned: {}", self.total_scanned),
            format!("Qualifying (Trend Template): {}", self.qualifying_count),
            format!("VCP candidates: {}", self.vcp_candidates.len()),
            format!("Breakouts: {}", self.breakouts.len()),
            format!("Errors: {}", self.errors),
            format!("Duration: {:.1}s", self.duration_secs),
        ]
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Write the report as `momentum_scan_<date>.<ext>` under `dir`.
    pub fn save_to_file(&self, dir: &Path, format: ReportFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let file_path = dir.join(format!("momentum_scan_{}.{}", self.scan_date, format.extension()));
        std::fs::write(&file_path, self.generate(format))
            .with_context(|| format!("Failed to write report {}", file_path.display()))?;

        Ok(file_path)
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "# Momentum Scan {}\n\n**Scan ID**: {}\n**Duration**: {:.1}s\n\n",
            self.scan_date, self.scan_id, self.duration_secs
        ));

        if let Some(error) = &self.error_message {
            md.push_str(&format!("**Scan failed**: {}\n", error));
            return md;
        }

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Scanned**: {}\n", self.total_scanned));
        md.push_str(&format!("- **Qualifying**: {}\n", self.qualifying_count));
        md.push_str(&format!("- **VCP candidates**: {}\n", self.vcp_candidates.len()));
        md.push_str(&format!("- **Breakouts**: {}\n", self.breakouts.len()));
        md.push_str(&format!("- **Errors**: {}\n\n", self.errors));

        md.push_str("### Funnel\n\n");
        md.push_str("| Stage | Passed | Eliminated | Rate |\n");
        md.push_str("|-------|--------|------------|------|\n");
        for stage in self.funnel() {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                stage.stage, stage.passed, stage.eliminated, stage.elimination_rate
            ));
        }
        md.push('\n');

        if !self.qualifying.is_empty() {
            md.push_str("## Trend Template Leaders\n\n");
            md.push_str("| Symbol | Name | Sector | RS | Close | From Low | From High | F&O |\n");
            md.push_str("|--------|------|--------|----|-------|----------|-----------|-----|\n");
            for s in self.top(50) {
                md.push_str(&format!(
                    "| [{}]({}) | {} | {} | {:.1} | {} | {} | {} | {} |\n",
                    s.symbol,
                    s.chart_link(),
                    s.company_name,
                    s.sector.as_deref().unwrap_or("-"),
                    s.rs_rating,
                    fmt_opt(s.close, 2, ""),
                    fmt_opt(s.pct_above_low, 1, "%"),
                    fmt_opt(s.pct_below_high.map(|p| -p), 1, "%"),
                    if s.is_fno { "yes" } else { "" }
                ));
            }
            md.push('\n');
        }

        if !self.vcp_candidates.is_empty() {
            md.push_str("## VCP Candidates\n\n");
            md.push_str("| Symbol | Notation | Pivot | From Pivot | Volume | Quality |\n");
            md.push_str("|--------|----------|-------|------------|--------|---------|\n");
            for v in &self.vcp_candidates {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {:.1}% | {} | {} |\n",
                    v.symbol,
                    v.notation,
                    v.pivot_price,
                    v.pct_from_pivot,
                    v.volume_trend,
                    v.quality_score
                ));
            }
            md.push('\n');
        }

        if !self.breakouts.is_empty() {
            md.push_str("## Breakouts\n\n");
            md.push_str("| Symbol | Price | Volume | Stop | Risk |\n");
            md.push_str("|--------|-------|--------|------|------|\n");
            for b in &self.breakouts {
                md.push_str(&format!(
                    "| {} | {:.2} | {:.2}x | {:.2} | {:.1}% |\n",
                    b.symbol, b.breakout_price, b.volume_ratio, b.suggested_stop, b.risk_pct
                ));
            }
            md.push('\n');
        }

        md.push_str("---\n\n");
        md.push_str(&format!(
            "*Generated {} UTC. Advisory only.*\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));

        md
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn fmt_opt(value: Option<f64>, dp: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", dp, v, suffix),
        None => "-".to_string(),
    }
}
