//! Auto-match confidence scoring

use crate::config::defaults::NEGLIGIBLE_RMSE;

/// Relative objective improvement `(initial - final) / initial`, in [0, 1].
///
/// A starting point that already fits (initial RMSE ≈ 0) scores 1.0. A
/// non-finite initial RMSE means nothing could be compared and scores 0.0.
pub fn score_confidence(initial_rmse: f64, final_rmse: f64) -> f64 {
    if !initial_rmse.is_finite() || !final_rmse.is_finite() {
        return 0.0;
    }
    if initial_rmse < NEGLIGIBLE_RMSE {
        return 1.0;
    }
    ((initial_rmse - final_rmse) / initial_rmse).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_improvement() {
        assert!((score_confidence(0.4, 0.1) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_no_improvement_is_zero() {
        assert_eq!(score_confidence(0.4, 0.4), 0.0);
        assert_eq!(score_confidence(0.4, 0.5), 0.0);
    }

    #[test]
    fn test_perfect_start_is_one() {
        assert_eq!(score_confidence(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(score_confidence(f64::INFINITY, f64::INFINITY), 0.0);
    }
}
