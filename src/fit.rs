//! Piecewise-linear fitting of register frequency response
//!
//! The series is cut at the detected breakpoints (plus both endpoints) and an
//! ordinary least-squares line is fitted to each inclusive segment. Each
//! segment applies up to and including its threshold, the x value of its last
//! sample; queries past the last threshold extrapolate the final segment.

use crate::archive::FrequencySeries;
use crate::breakpoints::detect_breakpoints;
use crate::config::FitConfig;
use serde::Serialize;
use thiserror::Error;

/// Numerical failure fitting one segment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Need at least 2 points for a line, got {0}")]
    TooFewPoints(usize),

    #[error("x values have zero variance")]
    Degenerate,

    #[error("Least-squares solution is not finite")]
    NonFinite,
}

/// One linear piece of a model, valid for x up to `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub threshold: f64,
    pub slope: f64,
    pub intercept: f64,
}

impl Segment {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fitted piecewise-linear model for one register
///
/// Segments are ordered by increasing threshold and never empty. Models are
/// only built by [`fit_piecewise`], so there is no `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitModel {
    register: String,
    segments: Vec<Segment>,
    r_squared: f64,
    min_frequency: f64,
    max_frequency: f64,
}

impl FitModel {
    pub fn register(&self) -> &str {
        &self.register
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Coefficient of determination against the input samples, in [0, 1]
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    /// Lowest frequency the model was fitted on
    pub fn min_frequency(&self) -> f64 {
        self.min_frequency
    }

    /// Highest frequency the model was fitted on
    pub fn max_frequency(&self) -> f64 {
        self.max_frequency
    }

    /// Segment whose formula applies at `x`, falling back to the last one
    pub fn segment_for(&self, x: f64) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| x <= s.threshold)
            .or_else(|| self.segments.last())
    }

    /// Evaluate the piecewise function at `x`
    ///
    /// A model without segments evaluates to NaN.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.segment_for(x).map_or(f64::NAN, |s| s.evaluate(x))
    }

    /// Evaluate the model at `points` evenly spaced frequencies spanning the
    /// fitted range, both ends included
    pub fn sample_curve(&self, points: usize) -> Vec<(f64, f64)> {
        match points {
            0 => Vec::new(),
            1 => vec![(self.min_frequency, self.evaluate(self.min_frequency))],
            _ => {
                let step = (self.max_frequency - self.min_frequency) / (points - 1) as f64;
                (0..points)
                    .map(|i| {
                        let x = if i == points - 1 {
                            self.max_frequency
                        } else {
                            self.min_frequency + step * i as f64
                        };
                        (x, self.evaluate(x))
                    })
                    .collect()
            }
        }
    }
}

/// Ordinary least-squares line through the points, as `(slope, intercept)`
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<(f64, f64), FitError> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(FitError::TooFewPoints(n));
    }
    let (x, y) = (&x[..n], &y[..n]);

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (sxx, sxy) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi - mean_x;
            (sxx + dx * dx, sxy + dx * (yi - mean_y))
        });

    if !sxx.is_finite() {
        return Err(FitError::NonFinite);
    }
    if sxx == 0.0 {
        return Err(FitError::Degenerate);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok((slope, intercept))
}

/// Coefficient of determination, clamped to be non-negative
///
/// A constant series has no variance to explain and scores exactly 0.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;

    let ss_res: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(o, f)| (o - f).powi(2))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return 0.0;
    }
    // f64::max discards a NaN ratio
    0.0_f64.max(1.0 - ss_res / ss_tot)
}

/// Fit a piecewise-linear model to a sampled series
///
/// `x` must be strictly increasing. Returns `None` when there are fewer than
/// `config.min_fit_points` samples or no segment could be fitted; segments
/// that fail numerically are dropped individually.
pub fn fit_piecewise(
    x: &[f64],
    y: &[f64],
    register: &str,
    config: &FitConfig,
) -> Option<FitModel> {
    let n = x.len();
    if n != y.len() || n < config.min_fit_points.max(3) {
        return None;
    }

    let mut breakpoints = vec![0];
    breakpoints.extend(detect_breakpoints(x, y, config));
    breakpoints.push(n - 1);
    breakpoints.sort_unstable();
    breakpoints.dedup();

    let mut segments = Vec::with_capacity(breakpoints.len() - 1);
    for pair in breakpoints.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end - start + 1 < 2 {
            continue;
        }
        match linear_fit(&x[start..=end], &y[start..=end]) {
            Ok((slope, intercept)) => segments.push(Segment {
                threshold: x[end],
                slope,
                intercept,
            }),
            Err(e) => {
                tracing::debug!(
                    "{}: dropping segment {}..={}: {}",
                    register,
                    start,
                    end,
                    e
                );
            }
        }
    }

    if segments.is_empty() {
        tracing::debug!("{}: no segment could be fitted", register);
        return None;
    }

    let mut model = FitModel {
        register: register.to_string(),
        segments,
        r_squared: 0.0,
        min_frequency: x[0],
        max_frequency: x[n - 1],
    };
    let fitted: Vec<f64> = x.iter().map(|&xi| model.evaluate(xi)).collect();
    model.r_squared = r_squared(y, &fitted);

    Some(model)
}

/// Fit a model to a register's frequency series
pub fn fit_series(
    register: &str,
    series: &FrequencySeries,
    config: &FitConfig,
) -> Option<FitModel> {
    let (x, y): (Vec<f64>, Vec<f64>) = series
        .iter()
        .map(|(&freq, &value)| (f64::from(freq), value as f64))
        .unzip();
    fit_piecewise(&x, &y, register, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(x: &[f64], y: &[f64]) -> Option<FitModel> {
        fit_piecewise(x, y, "emc_test", &FitConfig::default())
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_linear_fit_exact() {
        let (slope, intercept) = linear_fit(&[1.0, 2.0, 3.0], &[5.0, 7.0, 9.0]).unwrap();
        assert!(approx(slope, 2.0, 1e-12));
        assert!(approx(intercept, 3.0, 1e-12));
    }

    #[test]
    fn test_linear_fit_failures() {
        assert_eq!(linear_fit(&[1.0], &[1.0]), Err(FitError::TooFewPoints(1)));
        assert_eq!(linear_fit(&[2.0, 2.0], &[1.0, 3.0]), Err(FitError::Degenerate));
        assert_eq!(
            linear_fit(&[0.0, f64::INFINITY], &[1.0, 3.0]),
            Err(FitError::NonFinite)
        );
    }

    #[test]
    fn test_r_squared_bounds() {
        assert_eq!(r_squared(&[4.0, 4.0, 4.0], &[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        // Worse than the mean clamps to 0
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), 0.0);
        assert_eq!(r_squared(&[], &[]), 0.0);
    }

    #[test]
    fn test_too_few_points() {
        assert!(fit(&[100.0, 200.0], &[1.0, 2.0]).is_none());
        assert!(fit(&[], &[]).is_none());
    }

    #[test]
    fn test_perfectly_linear_series() {
        let x = [400.0, 800.0, 1200.0, 1600.0, 2000.0];
        let y: Vec<f64> = x.iter().map(|v| 0.25 * v + 12.0).collect();

        let model = fit(&x, &y).unwrap();
        assert_eq!(model.segments().len(), 1);
        let seg = model.segments()[0];
        assert_eq!(seg.threshold, 2000.0);
        assert!(approx(seg.slope, 0.25, 1e-9));
        assert!(approx(seg.intercept, 12.0, 1e-6));
        assert!(approx(model.r_squared(), 1.0, 1e-9));
    }

    #[test]
    fn test_constant_series_scores_zero() {
        let x = [100.0, 200.0, 300.0, 400.0];
        let y = [7.0, 7.0, 7.0, 7.0];

        let model = fit(&x, &y).unwrap();
        assert_eq!(model.r_squared(), 0.0);
        assert_eq!(model.segments().len(), 1);
        assert!(approx(model.segments()[0].slope, 0.0, 1e-12));
        assert!(approx(model.evaluate(250.0), 7.0, 1e-9));
    }

    #[test]
    fn test_two_regimes() {
        let x = [100.0, 200.0, 300.0, 400.0, 500.0];
        let y = [10.0, 20.0, 30.0, 60.0, 90.0];

        let model = fit(&x, &y).unwrap();
        let segs = model.segments();
        assert_eq!(segs.len(), 2);

        assert_eq!(segs[0].threshold, 300.0);
        assert!(approx(segs[0].slope, 0.1, 1e-9));
        assert!(approx(segs[0].intercept, 0.0, 1e-6));

        assert_eq!(segs[1].threshold, 500.0);
        assert!(approx(segs[1].slope, 0.3, 1e-9));
        assert!(approx(segs[1].intercept, -60.0, 1e-6));

        assert!(model.r_squared() > 0.999);
        assert_eq!(model.register(), "emc_test");
    }

    #[test]
    fn test_evaluate_thresholds_and_extrapolation() {
        let x = [100.0, 200.0, 300.0, 400.0, 500.0];
        let y = [10.0, 20.0, 30.0, 60.0, 90.0];
        let model = fit(&x, &y).unwrap();

        assert!(approx(model.evaluate(300.0), 30.0, 1e-6));
        assert!(approx(model.evaluate(301.0), 30.3, 1e-6));
        assert!(approx(model.evaluate(50.0), 5.0, 1e-6));
        assert!(approx(model.evaluate(600.0), 120.0, 1e-6));
        assert_eq!(model.segment_for(600.0), Some(&model.segments()[1]));
    }

    #[test]
    fn test_empty_model_does_not_panic() {
        let model = FitModel {
            register: "emc_x".to_string(),
            segments: Vec::new(),
            r_squared: 0.0,
            min_frequency: 0.0,
            max_frequency: 0.0,
        };

        assert_eq!(model.segment_for(5.0), None);
        assert!(model.evaluate(5.0).is_nan());
        assert_eq!(model.sample_curve(3).len(), 3);
    }

    #[test]
    fn test_model_serializes_segments() {
        let model = fit(&[100.0, 200.0, 300.0], &[1.0, 2.0, 3.0]).unwrap();
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["register"], "emc_test");
        assert_eq!(json["segments"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["segments"][0]["threshold"], 300.0);
    }

    #[test]
    fn test_evaluator_consistent_with_r_squared() {
        let x = [100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0];
        let y = [3.0, 9.0, 4.0, 12.0, 18.0, 17.0, 30.0, 29.0];
        let model = fit(&x, &y).unwrap();

        let fitted: Vec<f64> = x.iter().map(|&v| model.evaluate(v)).collect();
        assert_eq!(r_squared(&y, &fitted), model.r_squared());
        assert!((0.0..=1.0).contains(&model.r_squared()));
    }

    #[test]
    fn test_sample_curve_spans_range() {
        let x = [100.0, 200.0, 300.0];
        let y = [1.0, 2.0, 3.0];
        let model = fit(&x, &y).unwrap();

        let curve = model.sample_curve(100);
        assert_eq!(curve.len(), 100);
        assert_eq!(curve[0].0, 100.0);
        assert_eq!(curve[99].0, 300.0);
        assert!(curve.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(model.sample_curve(0).is_empty());
        assert_eq!(model.sample_curve(1).len(), 1);
    }

    #[test]
    fn test_fit_series_from_map() {
        let series: FrequencySeries = [(1600, 0x20), (800, 0x10), (2400, 0x30)].into();
        let model = fit_series("emc_rc", &series, &FitConfig::default()).unwrap();
        assert_eq!(model.min_frequency(), 800.0);
        assert_eq!(model.max_frequency(), 2400.0);
        assert!(approx(model.segments()[0].slope, 0.02, 1e-9));
    }
}
