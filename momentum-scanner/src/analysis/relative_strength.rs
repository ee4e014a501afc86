//! Relative strength rating.
//!
//! Each stock's weighted multi-horizon performance is ranked against the
//! whole scanned universe and expressed as a percentile.

use serde::{Deserialize, Serialize};

use super::round_to;
use crate::screener::ScreenerRow;

/// Horizon weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsWeights {
    pub one_month: f64,
    pub three_months: f64,
    pub six_months: f64,
    pub one_year: f64,
}

impl Default for RsWeights {
    fn default() -> Self {
        Self {
            one_month: 0.2,
            three_months: 0.4,
            six_months: 0.2,
            one_year: 0.2,
        }
    }
}

/// Percentile ranker over the scanned universe.
#[derive(Debug, Clone, Default)]
pub struct RelativeStrengthRanker {
    weights: RsWeights,
}

impl RelativeStrengthRanker {
    pub fn new(weights: RsWeights) -> Self {
        Self { weights }
    }

    /// Weighted performance composite; a missing horizon counts as 0.
    pub fn composite(&self, row: &ScreenerRow) -> f64 {
        let w = &self.weights;
        w.three_months * row.perf_3m.unwrap_or(0.0)
            + w.six_months * row.perf_6m.unwrap_or(0.0)
            + w.one_year * row.perf_1y.unwrap_or(0.0)
            + w.one_month * row.perf_1m.unwrap_or(0.0)
    }

    /// RS rating per row, aligned with `rows`.
    ///
    /// Ratings are `average_rank / n × 100` rounded to one decimal, so ties
    /// share a rating and every value lies in (0, 100].
    pub fn rank(&self, rows: &[ScreenerRow]) -> Vec<f64> {
        let scores: Vec<f64> = rows.iter().map(|r| self.composite(r)).collect();
        percentile_ranks(&scores)
    }
}

/// Percentile rank with average ranks for ties, rounded to one decimal.
pub fn percentile_ranks(scores: &[f64]) -> Vec<f64> {
    let n = scores.len();
    let mut ratings = vec![0.0; n];
    if n == 0 {
        return ratings;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based positions start+1..=end share their mean
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let rating = round_to(avg_rank / n as f64 * 100.0, 1);
        for &idx in &order[start..end] {
            ratings[idx] = rating;
        }
        start = end;
    }

    ratings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(p1m: f64, p3m: f64, p6m: f64, p1y: f64) -> ScreenerRow {
        ScreenerRow {
            perf_1m: Some(p1m),
            perf_3m: Some(p3m),
            perf_6m: Some(p6m),
            perf_1y: Some(p1y),
            ..Default::default()
        }
    }

    #[test]
    fn test_composite_weights() {
        let ranker = RelativeStrengthRanker::default();
        let score = ranker.composite(&row(10.0, 20.0, 30.0, 40.0));
        // 0.4*20 + 0.2*30 + 0.2*40 + 0.2*10
        assert!((score - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_horizons_count_as_zero() {
        let ranker = RelativeStrengthRanker::default();
        let partial = ScreenerRow {
            perf_3m: Some(10.0),
            ..Default::default()
        };
        assert!((ranker.composite(&partial) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_ranks_distinct() {
        let ratings = percentile_ranks(&[30.0, 10.0, 20.0, 40.0]);
        assert_eq!(ratings, vec![75.0, 25.0, 50.0, 100.0]);
    }

    #[test]
    fn test_percentile_ranks_ties_share_average() {
        let ratings = percentile_ranks(&[5.0, 5.0, 1.0]);
        // ranks 2 and 3 average to 2.5 → 83.3
        assert_eq!(ratings, vec![83.3, 83.3, 33.3]);
    }

    #[test]
    fn test_rank_single_and_empty() {
        let ranker = RelativeStrengthRanker::default();
        assert!(ranker.rank(&[]).is_empty());
        assert_eq!(ranker.rank(&[row(1.0, 1.0, 1.0, 1.0)]), vec![100.0]);
    }
}
