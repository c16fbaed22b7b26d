//! Per-register analysis report
//!
//! Runs detection, fitting and code generation over every series of an
//! [`AnalysisResult`], in base-latency, class and register-name order.
//! Series with fewer than two frequencies, or that cannot be modelled, are
//! counted as skipped rather than reported.

use crate::archive::{AnalysisResult, FrequencySeries};
use crate::codegen::{class_listing, register_write, timing_function};
use crate::config::FitConfig;
use crate::dump::RegisterClass;
use crate::fit::{fit_series, FitModel};
use aprender::stats::DescriptiveStats;
use serde::Serialize;
use std::fmt::Write as _;
use trueno::Vector;

/// Which part of the analysis to report
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Only this base latency (all when `None`)
    pub base_latency: Option<String>,
    /// Only this register class (both when `None`)
    pub class: Option<RegisterClass>,
    /// Case-insensitive substring filter on register names
    pub search: String,
    /// Frequency whose raw value is looked up for every register
    pub lookup_frequency: Option<u32>,
    /// Number of fitted-curve samples to include (0 = none)
    pub curve_points: usize,
}

/// Raw register value at a requested frequency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueLookup {
    pub frequency: u32,
    pub value: Option<u64>,
}

impl ValueLookup {
    pub fn new(series: &FrequencySeries, frequency: u32) -> Self {
        Self {
            frequency,
            value: series.get(&frequency).copied(),
        }
    }

    /// `Value: 0x0000002A (42)`, or `Value: N/A` when no dump had the frequency
    pub fn describe(&self) -> String {
        match self.value {
            Some(v) => format!("Value: 0x{v:08X} ({v})"),
            None => "Value: N/A".to_string(),
        }
    }
}

/// Fitted model and generated code for one register
#[derive(Debug, Clone, Serialize)]
pub struct RegisterReport {
    pub base_latency: String,
    pub class: RegisterClass,
    pub register: String,
    pub frequencies: Vec<u32>,
    pub values: Vec<u64>,
    pub model: FitModel,
    pub timing_function: String,
    pub register_write: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<ValueLookup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub curve: Vec<(f64, f64)>,
}

/// Fit quality across one (base latency, class) group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub base_latency: String,
    pub class: RegisterClass,
    pub fitted: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_r_squared: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_r_squared: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_r_squared: Option<f32>,
}

impl ClassSummary {
    fn from_models(
        base_latency: &str,
        class: RegisterClass,
        r_squared: &[f32],
        skipped: usize,
    ) -> Self {
        let mut summary = Self {
            base_latency: base_latency.to_string(),
            class,
            fitted: r_squared.len(),
            skipped,
            mean_r_squared: None,
            median_r_squared: None,
            min_r_squared: None,
        };
        if r_squared.is_empty() {
            return summary;
        }

        let v = Vector::from_slice(r_squared);
        summary.mean_r_squared = v.mean().ok();
        summary.min_r_squared = v.min().ok();
        summary.median_r_squared = DescriptiveStats::new(&v).quantile(0.5).ok();
        summary
    }
}

/// Everything produced for one analysis run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub registers: Vec<RegisterReport>,
    pub summaries: Vec<ClassSummary>,
}

impl Report {
    /// Reports of one (base latency, class) group, in register-name order
    pub fn group<'a>(
        &'a self,
        base_latency: &'a str,
        class: RegisterClass,
    ) -> impl Iterator<Item = &'a RegisterReport> + 'a {
        self.registers
            .iter()
            .filter(move |r| r.base_latency == base_latency && r.class == class)
    }

    /// Register-write listing of one group, as pasted into the timing tables
    pub fn code_listing(
        &self,
        base_latency: &str,
        class: RegisterClass,
        config: &FitConfig,
    ) -> String {
        class_listing(self.group(base_latency, class).map(|r| &r.model), config)
    }
}

fn matches_search(register: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || register.to_lowercase().contains(&query.to_lowercase())
}

/// Fit and render every selected register of an analysis
pub fn build_report(
    result: &AnalysisResult,
    config: &FitConfig,
    options: &ReportOptions,
) -> Report {
    let mut report = Report::default();

    for (base_latency, tables) in &result.latencies {
        if options
            .base_latency
            .as_deref()
            .is_some_and(|wanted| wanted != base_latency.as_str())
        {
            continue;
        }

        for class in RegisterClass::ALL {
            if options.class.is_some_and(|wanted| wanted != class) {
                continue;
            }

            let mut r_squared = Vec::new();
            let mut skipped = 0;
            for (register, series) in tables.get(class) {
                if !matches_search(register, &options.search) {
                    continue;
                }
                match analyze_register(base_latency, class, register, series, config, options) {
                    Some(entry) => {
                        r_squared.push(entry.model.r_squared() as f32);
                        report.registers.push(entry);
                    }
                    None => skipped += 1,
                }
            }

            tracing::debug!(
                "{}bl {}: {} fitted, {} skipped",
                base_latency,
                class,
                r_squared.len(),
                skipped
            );
            report.summaries.push(ClassSummary::from_models(
                base_latency,
                class,
                &r_squared,
                skipped,
            ));
        }
    }

    report
}

fn analyze_register(
    base_latency: &str,
    class: RegisterClass,
    register: &str,
    series: &FrequencySeries,
    config: &FitConfig,
    options: &ReportOptions,
) -> Option<RegisterReport> {
    if series.len() < 2 {
        return None;
    }
    let model = fit_series(register, series, config)?;

    Some(RegisterReport {
        base_latency: base_latency.to_string(),
        class,
        register: register.to_string(),
        frequencies: series.keys().copied().collect(),
        values: series.values().copied().collect(),
        timing_function: timing_function(&model, config),
        register_write: register_write(&model, config),
        lookup: options
            .lookup_frequency
            .map(|freq| ValueLookup::new(series, freq)),
        curve: model.sample_curve(options.curve_points),
        model,
    })
}

/// Human-readable rendering of a report
///
/// With `code_only`, only the per-group register-write listings are printed.
pub fn render_text(report: &Report, config: &FitConfig, code_only: bool) -> String {
    let mut out = String::new();

    for summary in &report.summaries {
        let label = summary.class.to_string().to_uppercase();
        let _ = writeln!(out, "=== {}bl / {} ===", summary.base_latency, label);

        if summary.fitted == 0 {
            let _ = writeln!(out, "No {label} data.\n");
            continue;
        }

        if code_only {
            out.push_str(&report.code_listing(&summary.base_latency, summary.class, config));
            continue;
        }

        for entry in report.group(&summary.base_latency, summary.class) {
            let model = &entry.model;
            let _ = writeln!(
                out,
                "{} ({} points, {} segments) R² = {:.4}",
                entry.register,
                entry.frequencies.len(),
                model.segments().len(),
                model.r_squared()
            );
            if let Some(lookup) = &entry.lookup {
                let _ = writeln!(out, "@ {} MHz: {}", lookup.frequency, lookup.describe());
            }
            let _ = writeln!(out, "{}\n{}\n", entry.timing_function, entry.register_write);
        }

        if let (Some(mean), Some(median), Some(min)) = (
            summary.mean_r_squared,
            summary.median_r_squared,
            summary.min_r_squared,
        ) {
            let _ = writeln!(
                out,
                "{} fitted, {} skipped; R² mean {:.4}, median {:.4}, min {:.4}\n",
                summary.fitted, summary.skipped, mean, median, min
            );
        }
    }

    out
}
