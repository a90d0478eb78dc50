//! Observed-vs-modeled fit scoring

use crate::config::QualityThresholds;
use crate::types::{MatchQuality, MatchRating};

/// Scores a modeled curve against observations with RMSE and R².
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchQualityEvaluator {
    thresholds: QualityThresholds,
}

impl MatchQualityEvaluator {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Score `modeled` against `observed`.
    ///
    /// Series of unequal length are truncated to the shorter one, and pairs
    /// with a non-finite member are skipped. With no scoreable pairs the
    /// result is rmse 0, R² 0, Poor.
    pub fn evaluate(&self, observed: &[f64], modeled: &[f64]) -> MatchQuality {
        let pairs: Vec<(f64, f64)> = observed
            .iter()
            .zip(modeled)
            .map(|(&o, &m)| (o, m))
            .filter(|(o, m)| o.is_finite() && m.is_finite())
            .collect();

        if pairs.is_empty() {
            return MatchQuality {
                rmse: 0.0,
                r_squared: 0.0,
                rating: MatchRating::Poor,
                points: 0,
            };
        }

        let n = pairs.len() as f64;
        let mean = pairs.iter().map(|(o, _)| o).sum::<f64>() / n;
        let ss_res: f64 = pairs.iter().map(|(o, m)| (o - m).powi(2)).sum();
        let ss_tot: f64 = pairs.iter().map(|(o, _)| (o - mean).powi(2)).sum();

        let rmse = (ss_res / n).sqrt();
        let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        MatchQuality {
            rmse,
            r_squared,
            rating: self.rate(r_squared),
            points: pairs.len(),
        }
    }

    /// Qualitative rating; each threshold must be strictly exceeded.
    pub fn rate(&self, r_squared: f64) -> MatchRating {
        let t = &self.thresholds;
        if r_squared > t.excellent_r_squared {
            MatchRating::Excellent
        } else if r_squared > t.good_r_squared {
            MatchRating::Good
        } else if r_squared > t.fair_r_squared {
            MatchRating::Fair
        } else {
            MatchRating::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_curves_are_perfect() {
        let observed = [1.0, 2.5, 3.0, 4.2];
        let q = MatchQualityEvaluator::default().evaluate(&observed, &observed);
        assert_eq!(q.rmse, 0.0);
        assert_eq!(q.r_squared, 1.0);
        assert_eq!(q.rating, MatchRating::Excellent);
        assert_eq!(q.points, 4);
    }

    #[test]
    fn test_mean_curve_has_zero_r_squared() {
        let observed = [1.0, 2.0, 3.0, 4.0];
        let modeled = [2.5; 4];
        let q = MatchQualityEvaluator::default().evaluate(&observed, &modeled);
        assert!(q.r_squared.abs() < 1e-12);
        assert!((q.rmse - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(q.rating, MatchRating::Poor);
    }

    #[test]
    fn test_unequal_lengths_truncate_and_skip_non_finite() {
        let observed = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let modeled = [1.0, 2.0, 3.0, 4.0];
        let q = MatchQualityEvaluator::default().evaluate(&observed, &modeled);
        assert_eq!(q.points, 3);
        assert_eq!(q.rmse, 0.0);
    }

    #[test]
    fn test_empty_input_is_poor() {
        let q = MatchQualityEvaluator::default().evaluate(&[], &[1.0]);
        assert_eq!(q.points, 0);
        assert_eq!(q.rmse, 0.0);
        assert_eq!(q.r_squared, 0.0);
        assert_eq!(q.rating, MatchRating::Poor);
    }

    #[test]
    fn test_constant_observations_have_zero_r_squared() {
        let q = MatchQualityEvaluator::default().evaluate(&[2.0, 2.0, 2.0], &[2.0, 2.0, 2.0]);
        assert_eq!(q.r_squared, 0.0);
        assert_eq!(q.rating, MatchRating::Poor);
    }

    #[test]
    fn test_rating_thresholds_are_strict() {
        let e = MatchQualityEvaluator::default();
        assert_eq!(e.rate(0.95), MatchRating::Excellent);
        assert_eq!(e.rate(0.9), MatchRating::Good);
        assert_eq!(e.rate(0.85), MatchRating::Good);
        assert_eq!(e.rate(0.8), MatchRating::Fair);
        assert_eq!(e.rate(0.6), MatchRating::Poor);
    }
}
