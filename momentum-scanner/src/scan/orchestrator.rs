//! Scan orchestrator.
//!
//! Sequences one scan:
//! 1. Fetch the screener universe
//! 2. Rank and evaluate the Trend Template
//! 3. Persist every snapshot under a scan session
//! 4. Check the strongest qualifiers for VCPs and breakouts
//! 5. Record the summary
//!
//! Every collaborator call is awaited in order; nothing is spawned.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use momentum_common::config::Config;

use super::progress::{vcp_phase_percent, ProgressEvent, ProgressSink};
use super::report::ScanReport;
use crate::analysis::{
    round_to, BreakoutDetector, BreakoutSignal, StockSnapshot, TrendTemplateEvaluator,
    VcpDetector, VcpPattern,
};
use crate::data::{
    history_ticker, Candle, HistoricalDataProvider, HistoryRange, ProviderError,
    YahooChartProvider,
};
use crate::reference::FnoUniverse;
use crate::screener::{ScreenerQuery, ScreenerSource, TradingViewScreener};
use crate::storage::ScanStore;

/// Progress emitted every this many VCP candidates.
const PROGRESS_EVERY: usize = 5;

// ============================================================================
// Settings
// ============================================================================

/// Orchestration knobs resolved from `ScannerConfig`.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub scan_type: String,
    pub vcp_top_n: usize,
    pub history_range: HistoryRange,
    pub min_history_rows: usize,
    pub throttle_every: usize,
    pub throttle_delay: Duration,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let scanner = &config.scanner;
        let history_range = scanner
            .history_range
            .parse::<HistoryRange>()
            .map_err(anyhow::Error::msg)
            .context("Invalid scanner.history_range")?;

        Ok(Self {
            scan_type: scanner.scan_type.clone(),
            vcp_top_n: scanner.vcp_top_n,
            history_range,
            min_history_rows: scanner.min_history_rows,
            throttle_every: scanner.throttle_every.max(1),
            throttle_delay: Duration::from_millis(scanner.throttle_delay_ms),
        })
    }
}

// ============================================================================
// Per-symbol outcome
// ============================================================================

/// Why a VCP candidate was skipped.
#[derive(Debug)]
enum SkipCause {
    Unsupported,
    History(ProviderError),
    TooShort(usize),
}

impl SkipCause {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::History(e) => e.kind(),
            Self::TooShort(_) => "too_short",
        }
    }
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported instrument"),
            Self::History(e) => write!(f, "{}", e),
            Self::TooShort(rows) => write!(f, "only {} rows of history", rows),
        }
    }
}

enum SymbolOutcome {
    Skipped(SkipCause),
    Checked {
        pattern: Option<VcpPattern>,
        breakout: Option<BreakoutSignal>,
    },
}

// ============================================================================
// Scan Orchestrator
// ============================================================================

/// Runs the screen → template → VCP → breakout pipeline.
pub struct ScanOrchestrator {
    screener: Arc<dyn ScreenerSource>,
    history: Arc<dyn HistoricalDataProvider>,
    store: Arc<dyn ScanStore>,
    evaluator: TrendTemplateEvaluator,
    vcp: VcpDetector,
    breakout: BreakoutDetector,
    query: ScreenerQuery,
    settings: ScanSettings,
}

impl ScanOrchestrator {
    /// Create an orchestrator over explicit collaborators.
    pub fn new(
        screener: Arc<dyn ScreenerSource>,
        history: Arc<dyn HistoricalDataProvider>,
        store: Arc<dyn ScanStore>,
        fno: Arc<FnoUniverse>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            screener,
            history,
            store,
            evaluator: TrendTemplateEvaluator::new(config.trend_template.clone(), fno),
            vcp: VcpDetector::new(config.vcp.clone()),
            breakout: BreakoutDetector::new(config.breakout.clone()),
            query: ScreenerQuery::from_config(&config.scanner),
            settings: ScanSettings::from_config(config)?,
        })
    }

    /// Create an orchestrator with the HTTP adapters and the configured
    /// F&O universe.
    pub fn from_config(config: &Config, store: Arc<dyn ScanStore>) -> Result<Self> {
        let fno = FnoUniverse::from_config(&config.reference)
            .context("Failed to load F&O reference set")?;
        Self::new(
            Arc::new(TradingViewScreener::from_config(&config.data_sources)),
            Arc::new(YahooChartProvider::from_config(&config.data_sources)),
            store,
            Arc::new(fno),
            config,
        )
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run one scan for `scan_date`.
    ///
    /// A screener failure is recorded and returned as a failed report.
    /// Storage failures are returned as errors.
    pub async fn run(&self, scan_date: NaiveDate, progress: &dyn ProgressSink) -> Result<ScanReport> {
        let started = Instant::now();
        let scan_type = self.settings.scan_type.as_str();

        info!(%scan_date, scan_type, source = self.screener.name(), "Starting momentum scan");

        // Phase 1: screener universe
        progress.emit(&ProgressEvent::progress(
            5,
            format!("Fetching data from {} screener...", self.screener.name()),
        ));

        let frame = match self.screener.fetch(&self.query).await {
            Ok(frame) => frame,
            Err(e) => {
                let message = format!("{}: {}", self.screener.name(), e);
                error!(error = %e, "Screener fetch failed, aborting scan");
                let scan_id = self
                    .store
                    .record_failed_scan(scan_date, scan_type, &message)
                    .await
                    .context("Failed to record failed scan")?;
                let duration = round_to(started.elapsed().as_secs_f64(), 1);
                return Ok(ScanReport::failed(scan_id, scan_date, duration, message));
            }
        };

        let total_scanned = frame.rows.len();
        progress.emit(&ProgressEvent::progress(
            20,
            format!(
                "Received {} stocks from {} ({} total)",
                total_scanned,
                self.screener.name(),
                frame.total_count
            ),
        ));

        // Phase 2: rank + evaluate
        progress.emit(&ProgressEvent::progress(
            30,
            format!("Applying Trend Template to {} stocks...", total_scanned),
        ));

        let snapshots = self.evaluator.evaluate(&frame.rows);

        let mut qualifying: Vec<StockSnapshot> = snapshots
            .iter()
            .filter(|s| s.passes_trend_template)
            .cloned()
            .collect();
        qualifying.sort_by(|a, b| b.rs_rating.partial_cmp(&a.rs_rating).unwrap_or(Ordering::Equal));

        progress.emit(&ProgressEvent::progress(
            50,
            format!("{} stocks pass all 8 criteria", qualifying.len()),
        ));
        info!(
            total = total_scanned,
            qualifying = qualifying.len(),
            "Trend Template evaluation complete"
        );

        // Phase 3: persist the evaluated universe
        let scan_id = self
            .store
            .create_scan(scan_date, scan_type, total_scanned)
            .await
            .context("Failed to open scan session")?;
        self.store
            .save_results(scan_id, &snapshots)
            .await
            .context("Failed to save scan results")?;

        // Phase 4: VCP + breakout on the strongest qualifiers
        let candidates: Vec<&StockSnapshot> = qualifying
            .iter()
            .filter(|s| s.signals.pct_above_low_50)
            .take(self.settings.vcp_top_n)
            .collect();

        progress.emit(&ProgressEvent::progress(
            60,
            format!(
                "{} stocks pass Trend Template. Checking VCP patterns on {}...",
                qualifying.len(),
                candidates.len()
            ),
        ));

        let mut errors = 0;
        let mut vcp_candidates = Vec::new();
        let mut breakouts = Vec::new();

        for (i, snap) in candidates.iter().enumerate() {
            if i % PROGRESS_EVERY == 0 {
                progress.emit(&ProgressEvent::progress(
                    vcp_phase_percent(i, candidates.len()),
                    format!("VCP check: {} ({}/{})", snap.symbol, i + 1, candidates.len()),
                ));
            }

            match self.check_symbol(scan_date, snap).await? {
                SymbolOutcome::Skipped(cause) => {
                    errors += 1;
                    debug!(
                        symbol = %snap.symbol,
                        kind = cause.kind(),
                        reason = %cause,
                        "Skipped VCP check"
                    );
                }
                SymbolOutcome::Checked { pattern, breakout } => {
                    if let Some(pattern) = pattern {
                        vcp_candidates.push(pattern);
                    }
                    if let Some(signal) = breakout {
                        breakouts.push(signal);
                    }
                }
            }

            if (i + 1) % self.settings.throttle_every == 0 && !self.settings.throttle_delay.is_zero() {
                tokio::time::sleep(self.settings.throttle_delay).await;
            }
        }

        if errors > 0 {
            warn!(errors, checked = candidates.len(), "Some VCP candidates were skipped");
        }

        // Phase 5: summary
        let duration = started.elapsed().as_secs_f64();
        self.store
            .complete_scan(scan_id, qualifying.len(), duration)
            .await
            .context("Failed to complete scan session")?;

        progress.emit(&ProgressEvent::complete(format!(
            "Scan complete: {} qualifying, {} VCP, {} breakouts ({:.0}s)",
            qualifying.len(),
            vcp_candidates.len(),
            breakouts.len(),
            duration
        )));

        let report = ScanReport {
            scan_id,
            scan_date,
            total_scanned,
            errors,
            qualifying_count: qualifying.len(),
            vcp_checked: candidates.len(),
            qualifying,
            vcp_candidates,
            breakouts,
            duration_secs: round_to(duration, 1),
            error_message: None,
        };

        info!(scan_id, "{}", report.summary());
        Ok(report)
    }

    async fn check_symbol(&self, scan_date: NaiveDate, snap: &StockSnapshot) -> Result<SymbolOutcome> {
        let Some(ticker) = history_ticker(&snap.exchange, &snap.symbol) else {
            return Ok(SymbolOutcome::Skipped(SkipCause::Unsupported));
        };

        let candles = match self
            .history
            .daily_history(&ticker, self.settings.history_range)
            .await
        {
            Ok(candles) => candles,
            Err(e) => return Ok(SymbolOutcome::Skipped(SkipCause::History(e))),
        };

        if candles.len() < self.settings.min_history_rows {
            return Ok(SymbolOutcome::Skipped(SkipCause::TooShort(candles.len())));
        }

        let pattern = self.vcp.detect(&snap.symbol, scan_date, &candles);
        let pattern_id = match &pattern {
            Some(p) => {
                let id = self
                    .store
                    .save_vcp_pattern(p)
                    .await
                    .with_context(|| format!("Failed to save VCP pattern for {}", snap.symbol))?;
                debug!(symbol = %snap.symbol, notation = %p.notation, pattern_id = id, "VCP detected");
                Some(id)
            }
            None => None,
        };

        // Today's pattern includes today's bar, so its pivot is at or above
        // today's close. A breakout is measured against an earlier base.
        let prior = self
            .store
            .prior_active_pattern(&snap.symbol, scan_date)
            .await
            .with_context(|| format!("Failed to load prior pattern for {}", snap.symbol))?;

        let reference = match (prior, &pattern, pattern_id) {
            (Some(prior), _, _) => Some((prior.id, prior.pattern.pivot_price)),
            (None, Some(p), Some(id)) => Some((id, p.pivot_price)),
            _ => None,
        };

        let breakout = match reference {
            Some((reference_id, pivot)) => {
                self.confirm_breakout(scan_date, snap, &candles, reference_id, pivot)
                    .await?
            }
            None => None,
        };

        Ok(SymbolOutcome::Checked { pattern, breakout })
    }

    async fn confirm_breakout(
        &self,
        scan_date: NaiveDate,
        snap: &StockSnapshot,
        candles: &[Candle],
        pattern_id: i64,
        pivot: f64,
    ) -> Result<Option<BreakoutSignal>> {
        let Some(mut signal) =
            self.breakout
                .check(&snap.symbol, scan_date, candles, pivot, snap.avg_volume)
        else {
            return Ok(None);
        };

        signal.pattern_id = Some(pattern_id);
        self.store
            .save_breakout(&signal)
            .await
            .with_context(|| format!("Failed to save breakout for {}", snap.symbol))?;

        info!(
            symbol = %signal.symbol,
            price = signal.breakout_price,
            pivot,
            volume_ratio = signal.volume_ratio,
            "Breakout confirmed"
        );
        Ok(Some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_cause_kind_and_reason() {
        let cause = SkipCause::History(ProviderError::RateLimited);
        assert_eq!(cause.kind(), "rate_limited");
        assert_eq!(cause.to_string(), "Rate limited");

        assert_eq!(SkipCause::Unsupported.kind(), "unsupported");
        let short = SkipCause::TooShort(12);
        assert_eq!(short.kind(), "too_short");
        assert_eq!(short.to_string(), "only 12 rows of history");
    }
}
