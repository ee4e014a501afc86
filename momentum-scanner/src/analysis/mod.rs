//! Momentum analysis.
//!
//! - **relative_strength**: percentile RS rating over the universe
//! - **trend_template**: Minervini's eight criteria plus supplementary signals
//! - **vcp**: Volatility Contraction Pattern detection on daily candles
//! - **breakout**: pivot breakout on expanding volume

pub mod breakout;
pub mod relative_strength;
pub mod trend_template;
pub mod vcp;

pub use breakout::{BreakoutDetector, BreakoutSignal};
pub use relative_strength::{percentile_ranks, RelativeStrengthRanker, RsWeights};
pub use trend_template::{StockSnapshot, SupplementarySignals, TrendCriteria, TrendTemplateEvaluator};
pub use vcp::{VcpDetector, VcpPattern, VolumeTrend};

/// Round half away from zero to `dp` decimals.
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.346, 2), 12.35);
        assert_eq!(round_to(29.96, 1), 30.0);
        assert_eq!(round_to(-1.25, 1), -1.3);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}
