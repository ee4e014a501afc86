//! Property tests for the numeric invariants of the analysis stages.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use momentum_scanner::analysis::{
    percentile_ranks, round_to, BreakoutDetector, VcpDetector, VcpPattern,
};
use momentum_scanner::data::Candle;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

/// (low, range, close fraction, volume) per bar.
fn bar_strategy() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (50.0..150.0f64, 0.1..30.0f64, 0.0..=1.0f64, 1_000.0..1_000_000.0f64)
}

fn candles(bars: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    bars.iter()
        .enumerate()
        .map(|(i, &(low, range, frac, volume))| {
            let high = low + range;
            let close = low + range * frac;
            Candle {
                date: start() + Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}

/// Bars in the default 12-week base.
const BASE_BARS: usize = 60;

/// A 60-bar base under a 100 pivot. Each 20-bar segment opens at the pivot
/// and dips once to `100 - depth`; the remaining bars sit halfway down.
fn base(depths: [f64; 3], volumes: &[f64]) -> Vec<Candle> {
    (0..BASE_BARS)
        .map(|i| {
            let depth = depths[i / 20];
            let close = 100.0 - depth / 2.0;
            Candle {
                date: start() + Duration::days(i as i64),
                open: close,
                high: if i % 20 == 0 { 100.0 } else { close + 0.25 },
                low: if i % 20 == 10 { 100.0 - depth } else { close - 0.5 },
                close,
                volume: volumes[i],
            }
        })
        .collect()
}

/// Segment depths as the detector reports them.
fn expected_depths(depths: [f64; 3]) -> [f64; 3] {
    depths.map(|d| round_to((100.0 - (100.0 - d)) / 100.0 * 100.0, 1))
}

fn assert_vcp_invariants(vcp: &VcpPattern) -> Result<(), TestCaseError> {
    prop_assert_eq!(vcp.num_contractions, 3);
    prop_assert_eq!(vcp.contraction_depths.len(), 3);
    for pair in vcp.contraction_depths.windows(2) {
        prop_assert!(pair[1] < pair[0] * 1.1);
    }
    prop_assert!(vcp.contraction_depths[0] <= 35.0);
    prop_assert!(vcp.final_contraction_depth <= 15.0);
    prop_assert!(vcp.quality_score >= 50 && vcp.quality_score <= 100);
    prop_assert!(vcp.pct_from_pivot >= 0.0);
    Ok(())
}

proptest! {
    #[test]
    fn rs_ratings_are_percentiles(scores in prop::collection::vec(-100.0..300.0f64, 1..200)) {
        let ratings = percentile_ranks(&scores);
        prop_assert_eq!(ratings.len(), scores.len());
        for r in &ratings {
            prop_assert!(*r > 0.0 && *r <= 100.0, "rating {} out of range", r);
        }
        let best = scores.iter().cloned().fold(f64::MIN, f64::max);
        let top = scores.iter().position(|s| *s == best).unwrap();
        prop_assert!(ratings.iter().all(|r| *r <= ratings[top]));
    }

    #[test]
    fn vcp_accepts_exactly_contracting_bases(
        d1 in 25.0..45.0f64,
        ratio2 in 0.8..1.25f64,
        ratio3 in 0.2..1.2f64,
        volumes in prop::collection::vec(1_000.0..1_000_000.0f64, BASE_BARS),
    ) {
        let depths = [d1, d1 * ratio2, d1 * ratio2 * ratio3];
        let expected = expected_depths(depths);
        let should_accept = expected[1] < expected[0] * 1.1
            && expected[2] < expected[1] * 1.1
            && expected[0] <= 35.0
            && expected[2] <= 15.0;

        let found = VcpDetector::default().detect("PROP", start(), &base(depths, &volumes));
        prop_assert_eq!(found.is_some(), should_accept, "depths {:?}", expected);

        if let Some(vcp) = found {
            prop_assert_eq!(vcp.contraction_depths.clone(), expected.to_vec());
            assert_vcp_invariants(&vcp)?;
        }
    }

    #[test]
    fn vcp_detects_every_valid_base(
        d1 in 10.0..35.0f64,
        ratio2 in 0.2..0.99f64,
        ratio3 in 0.2..0.99f64,
        volumes in prop::collection::vec(1_000.0..1_000_000.0f64, BASE_BARS),
    ) {
        let d2 = d1 * ratio2;
        let d3 = (d2 * ratio3).min(14.9);
        prop_assume!(d3 >= 1.0);

        let vcp = VcpDetector::default().detect("PROP", start(), &base([d1, d2, d3], &volumes));
        prop_assert!(vcp.is_some(), "depths {:?}", expected_depths([d1, d2, d3]));
        if let Some(vcp) = vcp {
            prop_assert_eq!(vcp.pivot_price, 100.0);
            assert_vcp_invariants(&vcp)?;
        }
    }

    #[test]
    fn breakout_stop_tracks_pivot(
        bars in prop::collection::vec(bar_strategy(), 1..80),
        pivot in 50.0..200.0f64,
        avg_volume in 0.0..500_000.0f64,
    ) {
        let window = candles(&bars);
        let latest = window.last().unwrap().clone();
        if let Some(signal) = BreakoutDetector::default().check("PROP", start(), &window, pivot, avg_volume) {
            prop_assert!(latest.close > pivot);
            prop_assert_eq!(signal.suggested_stop, round_to(pivot * 0.92, 2));
            prop_assert!(signal.volume_ratio >= round_to(1.4, 2) - 0.01);
            prop_assert!(signal.risk_pct > 0.0);
        }
    }
}
