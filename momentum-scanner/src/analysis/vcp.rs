//! Volatility Contraction Pattern detection.
//!
//! The base is the last `lookback_weeks × 5` daily bars, split into three
//! equal segments (any trailing remainder is ignored). Each segment's
//! high-to-low depth must shrink relative to the one before it, the first
//! pullback must not be too deep and the last must be tight. Volume drying
//! up, price holding the 21-EMA and an inside bar raise the quality score.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use momentum_common::config::VcpConfig;

use super::round_to;
use crate::data::Candle;

/// Number of segments the base is split into.
const SEGMENTS: usize = 3;

/// Smallest base the detector will analyse.
const MIN_WINDOW_ROWS: usize = 20;

/// Smallest segment the detector will analyse.
const MIN_SEGMENT_ROWS: usize = 5;

const BASE_QUALITY: u8 = 50;
const DECLINING_VOLUME_BONUS: u8 = 15;
const NEAR_EMA_BONUS: u8 = 15;
const INSIDE_BAR_BONUS: u8 = 10;
const TIGHT_FINAL_BONUS: u8 = 10;

/// Volume behaviour across the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    /// Second-half mean volume below first-half mean
    Declining,
    Mixed,
}

impl VolumeTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declining => "declining",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected VCP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcpPattern {
    pub symbol: String,
    pub detected_date: NaiveDate,
    pub num_contractions: usize,
    /// Depths in percent, oldest first, one decimal
    pub contraction_depths: Vec<f64>,
    /// Highest high in the base
    pub pivot_price: f64,
    pub current_price: f64,
    /// Distance of the last close below the pivot, percent
    pub pct_from_pivot: f64,
    pub volume_trend: VolumeTrend,
    /// e.g. "12W 30%-18%-9% / 3T"
    pub notation: String,
    pub base_duration_weeks: usize,
    pub final_contraction_depth: f64,
    pub ema_21: Option<f64>,
    pub near_21ema: bool,
    pub has_inside_bar: bool,
    /// 0-100
    pub quality_score: u8,
    pub status: String,
}

/// Detects VCPs in daily candle history.
#[derive(Debug, Clone, Default)]
pub struct VcpDetector {
    config: VcpConfig,
}

impl VcpDetector {
    pub fn new(config: VcpConfig) -> Self {
        Self { config }
    }

    /// Bars required before detection is attempted.
    pub fn min_rows(&self) -> usize {
        self.config.lookback_weeks * 5
    }

    /// Look for a VCP in `candles` (oldest first).
    pub fn detect(
        &self,
        symbol: &str,
        detected_date: NaiveDate,
        candles: &[Candle],
    ) -> Option<VcpPattern> {
        let cfg = &self.config;
        let lookback = self.min_rows();
        if candles.len() < lookback {
            return None;
        }

        let window = &candles[candles.len() - lookback..];
        if window.len() < MIN_WINDOW_ROWS {
            return None;
        }

        let segment_len = window.len() / SEGMENTS;
        if segment_len < MIN_SEGMENT_ROWS {
            return None;
        }

        let depths: Vec<f64> = window
            .chunks_exact(segment_len)
            .take(SEGMENTS)
            .map(segment_depth)
            .collect();

        let contracting = depths
            .windows(2)
            .all(|pair| pair[1] < pair[0] * cfg.contraction_tolerance);
        if !contracting {
            return None;
        }

        let first_depth = depths[0];
        let final_depth = depths[depths.len() - 1];
        if first_depth > cfg.max_first_depth || final_depth > cfg.max_final_depth {
            return None;
        }

        let half = window.len() / 2;
        let volume_trend = if mean_volume(&window[half..]) < mean_volume(&window[..half]) {
            VolumeTrend::Declining
        } else {
            VolumeTrend::Mixed
        };

        let pivot = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let last = &window[window.len() - 1];
        let current = last.close;
        let pct_from_pivot = if pivot > 0.0 {
            (pivot - current) / pivot * 100.0
        } else {
            0.0
        };

        let ema_21 = ema(window, cfg.ema_period);
        let near_21ema = ema_21.is_some_and(|e| {
            e > 0.0 && (current - e).abs() / e * 100.0 <= cfg.ema_proximity_pct
        });

        let has_inside_bar = window.len() >= 2 && last.is_inside(&window[window.len() - 2]);

        let mut quality = BASE_QUALITY;
        if volume_trend == VolumeTrend::Declining {
            quality += DECLINING_VOLUME_BONUS;
        }
        if near_21ema {
            quality += NEAR_EMA_BONUS;
        }
        if has_inside_bar {
            quality += INSIDE_BAR_BONUS;
        }
        if final_depth <= cfg.tight_final_depth {
            quality += TIGHT_FINAL_BONUS;
        }

        Some(VcpPattern {
            symbol: symbol.to_string(),
            detected_date,
            num_contractions: depths.len(),
            notation: notation(cfg.lookback_weeks, &depths),
            contraction_depths: depths,
            pivot_price: round_to(pivot, 2),
            current_price: round_to(current, 2),
            pct_from_pivot: round_to(pct_from_pivot, 1),
            volume_trend,
            base_duration_weeks: cfg.lookback_weeks,
            final_contraction_depth: final_depth,
            ema_21: ema_21.map(|e| round_to(e, 2)),
            near_21ema,
            has_inside_bar,
            quality_score: quality.min(100),
            status: "active".to_string(),
        })
    }
}

/// (high - low) / high over one segment, percent, one decimal.
fn segment_depth(segment: &[Candle]) -> f64 {
    let high = segment.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = segment.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    if high > 0.0 {
        round_to((high - low) / high * 100.0, 1)
    } else {
        0.0
    }
}

fn mean_volume(bars: &[Candle]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(|c| c.volume).sum::<f64>() / bars.len() as f64
}

/// EMA of closes seeded with the first close; `None` below `period` bars.
fn ema(bars: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = bars[0].close;
    Some(bars[1..].iter().fold(seed, |acc, c| c.close * k + acc * (1.0 - k)))
}

fn notation(weeks: usize, depths: &[f64]) -> String {
    let joined = depths
        .iter()
        .map(|d| format!("{:.0}%", d))
        .collect::<Vec<_>>()
        .join("-");
    format!("{}W {} / {}T", weeks, joined, depths.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    /// Three 20-bar segments with the given lows under a flat 100 high.
    fn base(lows: [f64; 3], volumes: (f64, f64), last_close: f64) -> Vec<Candle> {
        let mut bars = Vec::new();
        for (s, low) in lows.iter().enumerate() {
            for j in 0..20 {
                let i = s * 20 + j;
                let close = if i == 59 { last_close } else { (100.0 + low) / 2.0 };
                bars.push(Candle {
                    date: day(i),
                    open: close,
                    high: if j == 0 { 100.0 } else { 99.0 },
                    low: if j == 10 { *low } else { close.min(99.0) - 0.5 },
                    close,
                    volume: if i < 30 { volumes.0 } else { volumes.1 },
                });
            }
        }
        bars
    }

    #[test]
    fn test_textbook_vcp() {
        let candles = base([70.0, 82.0, 91.0], (2000.0, 1000.0), 97.0);
        let vcp = VcpDetector::default()
            .detect("TEST", day(59), &candles)
            .expect("pattern");

        assert_eq!(vcp.contraction_depths, vec![30.0, 18.0, 9.0]);
        assert!(vcp.notation.contains("30%-18%-9%"));
        assert_eq!(vcp.notation, "12W 30%-18%-9% / 3T");
        assert_eq!(vcp.volume_trend, VolumeTrend::Declining);
        assert_eq!(vcp.pivot_price, 100.0);
        assert_eq!(vcp.current_price, 97.0);
        assert_eq!(vcp.pct_from_pivot, 3.0);
        assert!(vcp.ema_21.is_some());
        assert_eq!(vcp.status, "active");
        // 50 + declining volume + near EMA + inside bar; 9% final is not tight
        assert!(vcp.near_21ema);
        assert!(vcp.has_inside_bar);
        assert_eq!(vcp.quality_score, 90);
    }

    #[test]
    fn test_tight_final_contraction_scores_full_marks() {
        let candles = base([70.0, 82.0, 93.0], (2000.0, 1000.0), 97.0);
        let vcp = VcpDetector::default()
            .detect("TEST", day(59), &candles)
            .unwrap();

        assert_eq!(vcp.final_contraction_depth, 7.0);
        assert!(vcp.near_21ema);
        assert!(vcp.has_inside_bar);
        assert_eq!(vcp.volume_trend, VolumeTrend::Declining);
        assert_eq!(vcp.quality_score, 100);
    }

    #[test]
    fn test_no_inside_bar_loses_bonus() {
        let mut candles = base([70.0, 82.0, 91.0], (2000.0, 1000.0), 97.0);
        candles[59].high = 99.5;
        let vcp = VcpDetector::default()
            .detect("TEST", day(59), &candles)
            .unwrap();

        assert!(!vcp.has_inside_bar);
        assert!(vcp.near_21ema);
        assert_eq!(vcp.pivot_price, 100.0);
        assert_eq!(vcp.quality_score, 80);
    }

    #[test]
    fn test_away_from_ema_loses_bonus() {
        let detector = VcpDetector::new(VcpConfig {
            ema_proximity_pct: 1.0,
            ..Default::default()
        });
        let candles = base([70.0, 82.0, 91.0], (2000.0, 1000.0), 97.0);
        let vcp = detector.detect("TEST", day(59), &candles).unwrap();

        assert!(!vcp.near_21ema);
        assert!(vcp.has_inside_bar);
        assert_eq!(vcp.quality_score, 75);
    }

    #[test]
    fn test_expanding_contraction_rejected() {
        // 18 → 25 widens beyond the 10% tolerance
        let candles = base([70.0, 82.0, 75.0], (2000.0, 1000.0), 97.0);
        assert!(VcpDetector::default().detect("TEST", day(59), &candles).is_none());
    }

    #[test]
    fn test_deep_first_contraction_rejected() {
        let candles = base([60.0, 75.0, 90.0], (2000.0, 1000.0), 97.0);
        assert!(VcpDetector::default().detect("TEST", day(59), &candles).is_none());
    }

    #[test]
    fn test_loose_final_contraction_rejected() {
        let candles = base([70.0, 80.0, 84.0], (2000.0, 1000.0), 97.0);
        assert!(VcpDetector::default().detect("TEST", day(59), &candles).is_none());
    }

    #[test]
    fn test_too_little_history() {
        let candles = base([70.0, 82.0, 91.0], (2000.0, 1000.0), 97.0);
        assert!(VcpDetector::default()
            .detect("TEST", day(58), &candles[1..])
            .is_none());
    }

    #[test]
    fn test_short_lookback_segments_too_small() {
        // 3 weeks is 15 bars, below the 20-bar minimum
        let detector = VcpDetector::new(VcpConfig {
            lookback_weeks: 3,
            ..Default::default()
        });
        let candles = base([70.0, 82.0, 91.0], (2000.0, 1000.0), 97.0);
        assert!(detector.detect("TEST", day(59), &candles).is_none());
    }

    #[test]
    fn test_mixed_volume_loses_bonus() {
        let candles = base([70.0, 82.0, 91.0], (1000.0, 1000.0), 97.0);
        let vcp = VcpDetector::default()
            .detect("TEST", day(59), &candles)
            .unwrap();
        assert_eq!(vcp.volume_trend, VolumeTrend::Mixed);
        assert_eq!(vcp.quality_score, 75);
    }

    #[test]
    fn test_ema_seeded_with_first_close() {
        let bars: Vec<Candle> = (0..21)
            .map(|i| Candle {
                date: day(i),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 1.0,
            })
            .collect();
        let value = ema(&bars, 21).unwrap();
        assert!((value - 10.0).abs() < 1e-9);
        assert_eq!(ema(&bars[..20], 21), None);
    }
}
