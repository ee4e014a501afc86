//! Pivot breakout detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use momentum_common::config::BreakoutConfig;

use super::round_to;
use crate::data::Candle;

/// A confirmed breakout above a VCP pivot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSignal {
    pub symbol: String,
    pub breakout_date: NaiveDate,
    pub breakout_price: f64,
    /// Latest volume / average volume
    pub volume_ratio: f64,
    pub suggested_stop: f64,
    /// Distance from close to the stop, percent of close
    pub risk_pct: f64,
    /// Id of the VCP pattern row this breaks out of
    pub pattern_id: Option<i64>,
    pub status: String,
}

/// Confirms closes above the pivot on expanding volume.
#[derive(Debug, Clone, Default)]
pub struct BreakoutDetector {
    config: BreakoutConfig,
}

impl BreakoutDetector {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    /// Check the latest bar of `candles` against `pivot`.
    ///
    /// `avg_volume` is used when positive; otherwise the mean of the last
    /// `avg_volume_window` volumes (latest included) stands in.
    pub fn check(
        &self,
        symbol: &str,
        breakout_date: NaiveDate,
        candles: &[Candle],
        pivot: f64,
        avg_volume: f64,
    ) -> Option<BreakoutSignal> {
        let latest = candles.last()?;
        let cfg = &self.config;

        let avg_volume = if avg_volume > 0.0 {
            avg_volume
        } else {
            let tail = &candles[candles.len().saturating_sub(cfg.avg_volume_window)..];
            tail.iter().map(|c| c.volume).sum::<f64>() / tail.len() as f64
        };

        if latest.close <= pivot || avg_volume <= 0.0 {
            return None;
        }

        let volume_ratio = latest.volume / avg_volume;
        if volume_ratio < cfg.min_volume_ratio {
            return None;
        }

        let stop = pivot * cfg.stop_ratio;
        Some(BreakoutSignal {
            symbol: symbol.to_string(),
            breakout_date,
            breakout_price: round_to(latest.close, 2),
            volume_ratio: round_to(volume_ratio, 2),
            suggested_stop: round_to(stop, 2),
            risk_pct: round_to((latest.close - stop) / latest.close * 100.0, 1),
            pattern_id: None,
            status: "new".to_string(),
        })
    }
}
