//! regfit - piecewise-linear models of memory-controller register timings
//!
//! This library turns register dumps captured at several memory frequencies
//! and base latencies into per-register piecewise-linear models of value
//! versus frequency, and renders each model as C code for firmware timing
//! tables.
//!
//! Pipeline: [`archive::analyze_dir`] (using [`dump::parse_dump_file`]) builds
//! the series, [`fit::fit_series`] cuts each series at the breakpoints found
//! by [`breakpoints::detect_breakpoints`] and fits a line per segment, and
//! [`codegen`] renders the result.

pub mod archive;
pub mod breakpoints;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod dump;
pub mod fit;
pub mod report;
