//! CLI argument parsing for regfit

use crate::dump::RegisterClass;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "regfit")]
#[command(version)]
#[command(
    about = "Fit piecewise-linear frequency models to memory-controller register dumps",
    long_about = None
)]
pub struct Cli {
    /// Extracted dump tree laid out as <base_latency>/<mc|emc>/<freq>_*.txt
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// TOML file overriding fit and code generation settings
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Only analyze this base latency
    #[arg(short = 'b', long = "base-latency", value_name = "LABEL")]
    pub base_latency: Option<String>,

    /// Only analyze this register class
    #[arg(long = "class", value_enum)]
    pub class: Option<RegisterClass>,

    /// Only report registers whose name contains this text (case-insensitive)
    #[arg(short = 's', long = "search", value_name = "TEXT", default_value = "")]
    pub search: String,

    /// Show each register's raw value at this frequency
    #[arg(long = "at", value_name = "MHZ")]
    pub at: Option<u32>,

    /// Include this many fitted-curve samples per register (JSON output)
    #[arg(long = "curve-points", value_name = "N", default_value = "0")]
    pub curve_points: usize,

    /// Curvature percentile for the first breakpoint pass (overrides config)
    #[arg(long = "primary-percentile", value_name = "P")]
    pub primary_percentile: Option<f64>,

    /// Curvature percentile for the retry pass (overrides config)
    #[arg(long = "fallback-percentile", value_name = "P")]
    pub fallback_percentile: Option<f64>,

    /// Print only the register-write listings
    #[arg(long = "code-only")]
    pub code_only: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
