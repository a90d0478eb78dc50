//! Flow-Regime Classification
//!
//! Labels contiguous intervals of the derivative curve by the local log-log
//! slope of the derivative:
//!
//! | slope       | reading                                   |
//! |-------------|-------------------------------------------|
//! | ≈ 1         | wellbore storage (or late pseudo-steady)  |
//! | ≈ 0         | infinite-acting radial flow plateau       |
//! | other       | transition (before radial) / boundary     |
//!
//! Classification is positional: anything that happens after the first
//! radial-flow plateau is a boundary response, anything before it is early
//! time. A rise after the derivative has fallen off the storage hump is a
//! boundary response too, even when no plateau was long enough to count as
//! radial flow.

use statrs::statistics::{Data, Median, Statistics};
use tracing::debug;

use crate::config::RegimeSettings;
use crate::types::{FlowRegime, FlowRegimeSegment};

/// Per-point reading of the local slope, before positional labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlopeClass {
    Unknown,
    UnitSlope,
    Flat,
    Rising,
    Falling,
}

/// A maximal run of equal slope classes, inclusive bounds.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    end: usize,
    class: SlopeClass,
}

/// Flow-regime classifier
pub struct FlowRegimeClassifier;

impl FlowRegimeClassifier {
    /// Segment the derivative curve into labelled intervals.
    ///
    /// `log_times` are ln(superposition time); `derivative` is the Bourdet
    /// derivative at the same points. The returned segments are ordered,
    /// non-overlapping and cover every index exactly once.
    pub fn classify(
        log_times: &[f64],
        derivative: &[Option<f64>],
        settings: &RegimeSettings,
    ) -> Vec<FlowRegimeSegment> {
        let n = log_times.len().min(derivative.len());
        if n == 0 {
            return Vec::new();
        }
        let x = &log_times[..n];
        let d = &derivative[..n];

        let slopes = Self::local_slopes(x, d, settings.window_half_width);
        let classes: Vec<SlopeClass> = slopes
            .iter()
            .map(|s| Self::slope_class(*s, settings))
            .collect();

        let labelled = Self::label_runs(x, d, &Self::runs(&classes), settings);
        let segments = Self::merge(labelled)
            .into_iter()
            .map(|(start, end, regime)| FlowRegimeSegment {
                start_index: start,
                end_index: end,
                regime,
                confidence: Self::confidence(regime, &slopes[start..=end], settings),
            })
            .collect::<Vec<_>>();

        debug!(
            points = n,
            segments = segments.len(),
            "Flow regimes classified"
        );
        segments
    }

    /// Least-squares slope of ln(derivative) against ln(t) over a sliding
    /// window. Needs the centre point and at least three usable points.
    fn local_slopes(x: &[f64], d: &[Option<f64>], half_width: usize) -> Vec<Option<f64>> {
        let usable = |j: usize| d[j].filter(|v| *v > 0.0 && x[j].is_finite());
        let n = x.len();

        (0..n)
            .map(|i| {
                usable(i)?;
                let lo = i.saturating_sub(half_width);
                let hi = (i + half_width).min(n - 1);
                let (xs, ys): (Vec<f64>, Vec<f64>) = (lo..=hi)
                    .filter_map(|j| usable(j).map(|v| (x[j], v.ln())))
                    .unzip();
                if xs.len() < 3 {
                    return None;
                }
                Self::regression_slope(&xs, &ys)
            })
            .collect()
    }

    fn regression_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;

        let mut sum_xy = 0.0;
        let mut sum_xx = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            sum_xy += (x - x_mean) * (y - y_mean);
            sum_xx += (x - x_mean) * (x - x_mean);
        }

        if sum_xx < 1e-12 {
            return None;
        }
        let slope = sum_xy / sum_xx;
        slope.is_finite().then_some(slope)
    }

    fn slope_class(slope: Option<f64>, settings: &RegimeSettings) -> SlopeClass {
        match slope {
            None => SlopeClass::Unknown,
            Some(s) if (s - 1.0).abs() <= settings.unit_slope_tolerance => SlopeClass::UnitSlope,
            Some(s) if s.abs() <= settings.flat_tolerance => SlopeClass::Flat,
            Some(s) if s > 0.0 => SlopeClass::Rising,
            Some(_) => SlopeClass::Falling,
        }
    }

    fn runs(classes: &[SlopeClass]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for (i, &class) in classes.iter().enumerate() {
            match runs.last_mut() {
                Some(run) if run.class == class => run.end = i,
                _ => runs.push(Run { start: i, end: i, class }),
            }
        }
        runs
    }

    /// Median derivative of a run; the level a radial plateau sits at.
    fn plateau_level(d: &[Option<f64>], run: &Run) -> Option<f64> {
        let values: Vec<f64> = d[run.start..=run.end]
            .iter()
            .flatten()
            .copied()
            .filter(|v| *v > 0.0)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(Data::new(values).median())
    }

    fn label_runs(
        x: &[f64],
        d: &[Option<f64>],
        runs: &[Run],
        settings: &RegimeSettings,
    ) -> Vec<(usize, usize, FlowRegime)> {
        let mut radial_level: Option<f64> = None;
        // Set once the derivative has come down off the storage hump
        let mut past_hump = false;
        let mut boundary_seen = false;
        let mut labelled = Vec::with_capacity(runs.len());

        for run in runs {
            let late = radial_level.is_some() || boundary_seen;
            let early_or_boundary = |early: FlowRegime| {
                if late { FlowRegime::Boundary } else { early }
            };

            let regime = match run.class {
                SlopeClass::Unknown => FlowRegime::Indeterminate,
                // Storage cannot follow the hump; a renewed rise is a boundary
                SlopeClass::UnitSlope | SlopeClass::Rising if past_hump => FlowRegime::Boundary,
                SlopeClass::UnitSlope => early_or_boundary(FlowRegime::WellboreStorage),
                SlopeClass::Rising | SlopeClass::Falling => early_or_boundary(FlowRegime::Transition),
                SlopeClass::Flat => {
                    let span = x[run.end] - x[run.start];
                    let points = run.end - run.start + 1;
                    let long_enough =
                        span >= settings.min_radial_span && points >= settings.min_radial_points;
                    match (long_enough, Self::plateau_level(d, run), radial_level) {
                        (true, Some(level), None) => {
                            radial_level = Some(level);
                            FlowRegime::RadialFlow
                        }
                        (true, Some(level), Some(first)) => {
                            let ratio = (level / first).max(first / level);
                            if ratio >= settings.boundary_level_ratio {
                                FlowRegime::Boundary
                            } else {
                                FlowRegime::RadialFlow
                            }
                        }
                        _ => early_or_boundary(FlowRegime::Transition),
                    }
                }
            };
            past_hump |= run.class == SlopeClass::Falling;
            boundary_seen |= regime == FlowRegime::Boundary;
            labelled.push((run.start, run.end, regime));
        }
        labelled
    }

    fn merge(labelled: Vec<(usize, usize, FlowRegime)>) -> Vec<(usize, usize, FlowRegime)> {
        let mut merged: Vec<(usize, usize, FlowRegime)> = Vec::with_capacity(labelled.len());
        for (start, end, regime) in labelled {
            match merged.last_mut() {
                Some(last) if last.2 == regime => last.1 = end,
                _ => merged.push((start, end, regime)),
            }
        }
        merged
    }

    /// Consistency of the slopes inside a segment, in [0, 1].
    fn confidence(regime: FlowRegime, slopes: &[Option<f64>], settings: &RegimeSettings) -> f64 {
        if regime == FlowRegime::Indeterminate {
            return 0.0;
        }
        let values: Vec<f64> = slopes.iter().flatten().copied().collect();
        if values.len() < 2 {
            return 0.5;
        }
        let variance = values.iter().variance();
        if variance <= 0.0 {
            return 1.0;
        }
        (settings.confidence_variance_scale / variance).clamp(0.0, 1.0)
    }
}
