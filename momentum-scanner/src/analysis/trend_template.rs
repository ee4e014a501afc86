//! Minervini Trend Template evaluation.
//!
//! Eight boolean criteria over moving averages, 52-week range and RS rating:
//!
//! 1. Close above SMA150 and SMA200
//! 2. SMA150 above SMA200
//! 3. SMA200 trending up
//! 4. SMA50 above SMA150 and SMA200
//! 5. Close above SMA50
//! 6. At least 30% above the 52-week low
//! 7. Within 25% of the 52-week high
//! 8. RS rating of at least 70
//!
//! The screener carries no SMA200 history, so criterion 3 is approximated as
//! SMA150 > SMA200: a faster average above the slower one pulls it upward.
//! Criterion 3 therefore always equals criterion 2.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use momentum_common::config::TrendTemplateConfig;

use super::relative_strength::RelativeStrengthRanker;
use super::round_to;
use crate::reference::FnoUniverse;
use crate::screener::ScreenerRow;

// ============================================================================
// Criteria
// ============================================================================

/// The eight Trend Template criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendCriteria {
    #[serde(rename = "c1_above_150_200")]
    pub above_150_200: bool,
    #[serde(rename = "c2_150_above_200")]
    pub sma150_above_200: bool,
    #[serde(rename = "c3_200_rising")]
    pub sma200_rising: bool,
    #[serde(rename = "c4_50_above_150_200")]
    pub sma50_above_150_200: bool,
    #[serde(rename = "c5_above_50")]
    pub above_50: bool,
    #[serde(rename = "c6_30pct_above_low")]
    pub above_low: bool,
    #[serde(rename = "c7_within_25pct_high")]
    pub near_high: bool,
    #[serde(rename = "c8_rs_above_70")]
    pub rs_strong: bool,
}

impl TrendCriteria {
    fn as_array(&self) -> [bool; 8] {
        [
            self.above_150_200,
            self.sma150_above_200,
            self.sma200_rising,
            self.sma50_above_150_200,
            self.above_50,
            self.above_low,
            self.near_high,
            self.rs_strong,
        ]
    }

    /// Number of criteria met (0-8).
    pub fn count(&self) -> u8 {
        self.as_array().iter().filter(|&&c| c).count() as u8
    }

    pub fn all(&self) -> bool {
        self.as_array().iter().all(|&c| c)
    }
}

/// Non-gating momentum signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementarySignals {
    /// Big daily move on heavy relative volume
    pub momentum_burst: bool,
    /// 52-week high was set within the last six months
    pub recent_52w_high: bool,
    /// Close within a few percent of EMA20
    pub near_ema21: bool,
    /// Prior uptrend of at least 50% off the 52-week low
    pub pct_above_low_50: bool,
}

// ============================================================================
// Snapshot
// ============================================================================

/// One evaluated stock in one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub exchange: String,
    pub company_name: String,
    pub close: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_150: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_20: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub high_6m: Option<f64>,
    pub volume: f64,
    /// 30-day average volume
    pub avg_volume: f64,
    /// volume / avg_volume, 0 when no average is known
    pub volume_ratio: f64,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub is_fno: bool,
    pub rs_rating: f64,
    pub criteria: TrendCriteria,
    pub criteria_met: u8,
    pub passes_trend_template: bool,
    /// Percent above the 52-week low, one decimal
    pub pct_above_low: Option<f64>,
    /// Percent below the 52-week high, one decimal
    pub pct_below_high: Option<f64>,
    pub signals: SupplementarySignals,
}

impl StockSnapshot {
    /// Chart link for the dashboard.
    pub fn chart_link(&self) -> String {
        format!(
            "https://www.tradingview.com/chart/?symbol={}:{}",
            self.exchange, self.symbol
        )
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Applies the Trend Template to a screener universe.
pub struct TrendTemplateEvaluator {
    config: TrendTemplateConfig,
    fno: Arc<FnoUniverse>,
    ranker: RelativeStrengthRanker,
}

impl TrendTemplateEvaluator {
    pub fn new(config: TrendTemplateConfig, fno: Arc<FnoUniverse>) -> Self {
        Self {
            config,
            fno,
            ranker: RelativeStrengthRanker::default(),
        }
    }

    /// Rank and evaluate every row. Output is aligned with `rows`.
    pub fn evaluate(&self, rows: &[ScreenerRow]) -> Vec<StockSnapshot> {
        let ratings = self.ranker.rank(rows);
        rows.iter()
            .zip(ratings)
            .map(|(row, rs)| self.evaluate_row(row, rs))
            .collect()
    }

    /// Evaluate one row against a precomputed RS rating.
    pub fn evaluate_row(&self, row: &ScreenerRow, rs_rating: f64) -> StockSnapshot {
        let cfg = &self.config;

        let pct_above_low = match (row.close, row.low_52w) {
            (Some(close), Some(low)) if low > 0.0 => Some(round_to((close - low) / low * 100.0, 1)),
            _ => None,
        };
        let pct_below_high = match (row.close, row.high_52w) {
            (Some(close), Some(high)) if high > 0.0 => {
                Some(round_to((high - close) / high * 100.0, 1))
            }
            _ => None,
        };

        let close_above_150 = gt(row.close, row.sma150);
        let close_above_200 = gt(row.close, row.sma200);
        let sma150_above_200 = gt(row.sma150, row.sma200);

        let criteria = TrendCriteria {
            above_150_200: close_above_150 && close_above_200,
            sma150_above_200,
            sma200_rising: sma150_above_200,
            sma50_above_150_200: gt(row.sma50, row.sma150) && gt(row.sma50, row.sma200),
            above_50: gt(row.close, row.sma50),
            above_low: pct_above_low.is_some_and(|p| p >= cfg.min_pct_above_low),
            near_high: pct_below_high.is_some_and(|p| p <= cfg.max_pct_below_high),
            rs_strong: rs_rating >= cfg.min_rs_rating,
        };

        let required_present = [
            row.close,
            row.sma50,
            row.sma150,
            row.sma200,
            row.high_52w,
            row.low_52w,
        ]
        .iter()
        .all(Option::is_some);

        let signals = self.signals(row, pct_above_low);

        let volume = row.volume.unwrap_or(0.0);
        let avg_volume = row.avg_volume_30d.unwrap_or(0.0);
        let volume_ratio = if avg_volume > 0.0 {
            round_to(volume / avg_volume, 2)
        } else {
            0.0
        };

        StockSnapshot {
            symbol: row.symbol.clone(),
            exchange: row.exchange.clone(),
            company_name: row.name.clone().unwrap_or_default(),
            close: row.close.map(|v| round_to(v, 2)),
            sma_50: row.sma50.map(|v| round_to(v, 2)),
            sma_150: row.sma150.map(|v| round_to(v, 2)),
            sma_200: row.sma200.map(|v| round_to(v, 2)),
            ema_20: row.ema20.map(|v| round_to(v, 2)),
            high_52w: row.high_52w.map(|v| round_to(v, 2)),
            low_52w: row.low_52w.map(|v| round_to(v, 2)),
            high_6m: row.high_6m.map(|v| round_to(v, 2)),
            volume,
            avg_volume,
            volume_ratio,
            sector: row.sector.clone(),
            industry: row.industry.clone(),
            market_cap: row.market_cap,
            is_fno: self.fno.contains(&row.symbol),
            rs_rating,
            criteria,
            criteria_met: criteria.count(),
            passes_trend_template: required_present && criteria.all(),
            pct_above_low,
            pct_below_high,
            signals,
        }
    }

    fn signals(&self, row: &ScreenerRow, pct_above_low: Option<f64>) -> SupplementarySignals {
        let cfg = &self.config;

        let momentum_burst = row.change_pct.unwrap_or(0.0) >= cfg.burst_min_change_pct
            && row.relative_volume_10d.unwrap_or(0.0) >= cfg.burst_min_relative_volume;

        let high_6m = row.high_6m.unwrap_or(0.0);
        let high_52w = row.high_52w.unwrap_or(0.0);
        let recent_52w_high = high_6m >= high_52w * cfg.recent_high_ratio || high_52w <= 0.0;

        let ema = row.ema20.unwrap_or(0.0);
        let near_ema21 = ema > 0.0
            && row
                .close
                .is_some_and(|c| (c - ema).abs() / ema * 100.0 <= cfg.ema_proximity_pct);

        SupplementarySignals {
            momentum_burst,
            recent_52w_high,
            near_ema21,
            pct_above_low_50: pct_above_low.is_some_and(|p| p >= cfg.strict_pct_above_low),
        }
    }
}

/// `a > b`, false when either side is missing.
fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> TrendTemplateEvaluator {
        TrendTemplateEvaluator::new(
            TrendTemplateConfig::default(),
            Arc::new(FnoUniverse::new(["LEADER"])),
        )
    }

    fn leader() -> ScreenerRow {
        ScreenerRow {
            exchange: "NSE".into(),
            symbol: "LEADER".into(),
            name: Some("Leader Ltd".into()),
            close: Some(100.0),
            sma50: Some(95.0),
            sma150: Some(90.0),
            sma200: Some(85.0),
            ema20: Some(98.0),
            high_52w: Some(105.0),
            low_52w: Some(70.0),
            high_6m: Some(105.0),
            volume: Some(300_000.0),
            avg_volume_30d: Some(200_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_leader_passes_with_strong_rs() {
        let snap = evaluator().evaluate_row(&leader(), 80.0);
        assert!(snap.passes_trend_template);
        assert_eq!(snap.criteria_met, 8);
        assert_eq!(snap.pct_above_low, Some(42.9));
        assert_eq!(snap.pct_below_high, Some(4.8));
        assert!(snap.is_fno);
        assert!((snap.volume_ratio - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_weak_rs_fails_only_criterion_eight() {
        let snap = evaluator().evaluate_row(&leader(), 65.0);
        assert!(!snap.passes_trend_template);
        assert_eq!(snap.criteria_met, 7);
        assert!(!snap.criteria.rs_strong);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut row = leader();
        row.sma200 = None;
        let snap = evaluator().evaluate_row(&row, 95.0);
        assert!(!snap.passes_trend_template);
        assert!(!snap.criteria.above_150_200);
        assert!(!snap.criteria.sma150_above_200);
        assert!(snap.criteria.above_50);
    }

    #[test]
    fn test_criterion_three_mirrors_two() {
        let mut row = leader();
        row.sma150 = Some(80.0);
        let snap = evaluator().evaluate_row(&row, 90.0);
        assert!(!snap.criteria.sma150_above_200);
        assert!(!snap.criteria.sma200_rising);
    }

    #[test]
    fn test_rounded_percentages_gate_criteria() {
        // (100 - 76.94) / 76.94 = 29.97% → 30.0 after rounding → passes
        let mut row = leader();
        row.low_52w = Some(76.94);
        let snap = evaluator().evaluate_row(&row, 80.0);
        assert_eq!(snap.pct_above_low, Some(30.0));
        assert!(snap.criteria.above_low);
    }

    #[test]
    fn test_supplementary_signals() {
        let mut row = leader();
        row.change_pct = Some(6.2);
        row.relative_volume_10d = Some(2.5);
        row.low_52w = Some(60.0);
        let snap = evaluator().evaluate_row(&row, 80.0);
        assert!(snap.signals.momentum_burst);
        assert!(snap.signals.recent_52w_high);
        assert!(snap.signals.near_ema21);
        assert!(snap.signals.pct_above_low_50);

        row.relative_volume_10d = None;
        row.high_6m = Some(90.0);
        row.ema20 = Some(90.0);
        let snap = evaluator().evaluate_row(&row, 80.0);
        assert!(!snap.signals.momentum_burst);
        assert!(!snap.signals.recent_52w_high);
        assert!(!snap.signals.near_ema21);
    }

    #[test]
    fn test_recent_high_without_52w_high() {
        let mut row = leader();
        row.high_52w = None;
        row.high_6m = None;
        let snap = evaluator().evaluate_row(&row, 80.0);
        assert!(snap.signals.recent_52w_high);
        assert!(!snap.passes_trend_template);
    }

    #[test]
    fn test_evaluate_ranks_universe() {
        let mut weak = leader();
        weak.symbol = "LAGGARD".into();
        weak.perf_3m = Some(-10.0);
        let mut strong = leader();
        strong.perf_3m = Some(40.0);

        let snaps = evaluator().evaluate(&[weak, strong]);
        assert_eq!(snaps[0].rs_rating, 50.0);
        assert_eq!(snaps[1].rs_rating, 100.0);
        assert!(!snaps[0].passes_trend_template);
        assert!(snaps[1].passes_trend_template);
        assert_eq!(snaps[1].chart_link(), "https://www.tradingview.com/chart/?symbol=NSE:LEADER");
    }
}
