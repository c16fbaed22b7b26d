//! C source generation from fitted models
//!
//! Two renderings of the same segments:
//!
//! - a standalone `float timing(float x)` function with one guarded return
//!   per segment, and
//! - register-write statements chained on `freq`, ready to paste into the
//!   timing table code.
//!
//! Slopes keep `slope_decimals` digits and print as integers when whole;
//! intercepts are rounded to whole numbers and folded into `+`/`-`.

use crate::config::FitConfig;
use crate::fit::{FitModel, Segment};

/// Round half to even at `decimals` digits
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round_ties_even() / scale
}

fn format_slope(slope: f64, decimals: u32) -> String {
    let rounded = round_to(slope, decimals);
    if rounded == rounded.trunc() && rounded.abs() < i64::MAX as f64 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// Linear expression in `var`, or the bare constant for a flat segment
fn segment_value(segment: &Segment, var: &str, config: &FitConfig) -> Option<String> {
    if segment.slope.abs() < config.flat_slope_epsilon {
        return None;
    }

    let slope = format_slope(segment.slope, config.slope_decimals);
    let mut intercept = segment.intercept.round_ties_even();
    if intercept == 0.0 {
        // Drop the sign of -0.0
        intercept = 0.0;
    }
    let (op, magnitude) = if intercept >= 0.0 {
        ('+', intercept)
    } else {
        ('-', -intercept)
    };
    Some(format!("{slope} * {var} {op} {magnitude:.1}"))
}

fn constant(segment: &Segment) -> String {
    format!("{:.0}", segment.intercept)
}

/// Render the model as a C timing function of `x`
///
/// ```text
/// float timing(float x) {
///     if (x <= 300) return 0.1 * x + 0.0;
///     return 0.3 * x - 60.0;
/// }
/// ```
pub fn timing_function(model: &FitModel, config: &FitConfig) -> String {
    let segments = model.segments();
    let mut lines = Vec::with_capacity(segments.len() + 2);
    lines.push("float timing(float x) {".to_string());

    for (i, segment) in segments.iter().enumerate() {
        let value = segment_value(segment, "x", config).unwrap_or_else(|| constant(segment));
        if i == segments.len() - 1 {
            lines.push(format!("    return {value};"));
        } else {
            lines.push(format!(
                "    if (x <= {:.0}) return {value};",
                segment.threshold
            ));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Render the model as chained register writes keyed on `freq`
///
/// A segment ending within `terminal_tolerance` of the highest fitted
/// frequency is written unconditionally, wherever it falls in the chain.
///
/// ```text
/// if (freq <= 300) {
///     WRITE_ALL_PARAM_REG(EMC_emc_rc, (0.1 * freq + 0.0));
/// }
/// WRITE_ALL_PARAM_REG(EMC_emc_rc, (0.3 * freq - 60.0));
/// ```
pub fn register_write(model: &FitModel, config: &FitConfig) -> String {
    let target = format!("{}{}", config.register_prefix, model.register());
    let terminal_from = model.max_frequency() - config.terminal_tolerance;
    let mut lines = Vec::new();

    for (i, segment) in model.segments().iter().enumerate() {
        let value = segment_value(segment, "freq", config)
            .map(|expr| format!("({expr})"))
            .unwrap_or_else(|| constant(segment));
        let write = format!("{}({target}, {value});", config.write_macro);

        if segment.threshold >= terminal_from {
            lines.push(write);
            continue;
        }

        let keyword = if i == 0 { "if" } else { "else if" };
        lines.push(format!("{keyword} (freq <= {:.0}) {{", segment.threshold));
        lines.push(format!("    {write}"));
        lines.push("}".to_string());
    }

    lines.join("\n")
}

/// Concatenate the register-write blocks of several models, each followed by
/// a blank line
pub fn class_listing<'a>(
    models: impl IntoIterator<Item = &'a FitModel>,
    config: &FitConfig,
) -> String {
    models
        .into_iter()
        .map(|model| register_write(model, config) + "\n\n")
        .collect()
}
