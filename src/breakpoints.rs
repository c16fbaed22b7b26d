//! Breakpoint detection by curvature thresholding
//!
//! Successive slopes of the series are differenced; wherever the absolute
//! change in slope exceeds a percentile of all such changes, the sample in the
//! middle of that pair of slopes is a candidate regime boundary.
//!
//! This is a heuristic, not an exact changepoint detector. It favours
//! sensitivity to registers that are constant, then linear, then saturate.

use crate::config::FitConfig;

/// Percentile with linear interpolation between closest ranks
///
/// Matches the common "linear" definition: for `n` sorted values the rank is
/// `p / 100 * (n - 1)`. Returns `None` for empty input.
///
/// # Example
/// ```
/// use regfit::breakpoints::percentile;
///
/// assert_eq!(percentile(&[0.0, 10.0, 20.0], 50.0), Some(10.0));
/// assert_eq!(percentile(&[0.0, 10.0], 40.0), Some(4.0));
/// ```
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    let (a, b) = (sorted[lower], sorted[upper]);
    // Interpolate from the nearer end so equal neighbours come back exactly
    let value = if weight < 0.5 {
        a + (b - a) * weight
    } else {
        b - (b - a) * (1.0 - weight)
    };
    Some(value)
}

/// Absolute change between consecutive segment slopes
///
/// Entry `i` straddles samples `i`, `i + 1` and `i + 2`.
fn slope_changes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let slopes: Vec<f64> = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (ys[1] - ys[0]) / (xs[1] - xs[0]))
        .collect();

    slopes.windows(2).map(|s| (s[1] - s[0]).abs()).collect()
}

/// Series indices whose curvature exceeds the `p`-th percentile
fn select_above(curvature: &[f64], p: f64) -> Vec<usize> {
    let Some(threshold) = percentile(curvature, p) else {
        return Vec::new();
    };

    // Indices come out ascending and unique already
    curvature
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > threshold)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Find interior sample indices where the series changes regime
///
/// Returned indices are strictly increasing and lie in `1..=n-2`; the
/// endpoints are never reported. When the primary percentile yields fewer
/// than `config.min_breakpoints` points, the fallback percentile is tried
/// and its result is used instead, even if it is smaller.
///
/// `x` must be strictly increasing and the same length as `y`.
pub fn detect_breakpoints(x: &[f64], y: &[f64], config: &FitConfig) -> Vec<usize> {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 3 || x.len() != y.len() {
        return Vec::new();
    }

    let curvature = slope_changes(x, y);
    if curvature.is_empty() {
        return Vec::new();
    }

    let breakpoints = select_above(&curvature, config.primary_percentile);
    if breakpoints.len() >= config.min_breakpoints {
        return breakpoints;
    }

    tracing::trace!(
        "Only {} breakpoints at p{}, retrying at p{}",
        breakpoints.len(),
        config.primary_percentile,
        config.fallback_percentile
    );
    select_above(&curvature, config.fallback_percentile)
}
