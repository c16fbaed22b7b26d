//! Aggregation of an extracted dump tree
//!
//! Expected layout:
//!
//! ```text
//! <root>/<base_latency>/mc/<freq>_mc.txt
//! <root>/<base_latency>/emc/<freq>_emc.txt
//! ```
//!
//! Every base-latency directory yields both classes, even when a class
//! directory is missing. Register values are collected per frequency, where
//! the frequency is the first run of decimal digits in the dump's file name.

use crate::dump::{parse_dump_file, RegisterClass};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Extension of dump files inside a class directory
const DUMP_EXTENSION: &str = "txt";

/// Frequency in MHz to register value
pub type FrequencySeries = BTreeMap<u32, u64>;

/// Register name to its frequency series
pub type RegisterTable = BTreeMap<String, FrequencySeries>;

/// Failures that prevent any analysis of the tree
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Dump root not found: {0}")]
    NotFound(PathBuf),

    #[error("Dump root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read dump root {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Register tables of both classes for one base latency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassTables {
    pub mc: RegisterTable,
    pub emc: RegisterTable,
}

impl ClassTables {
    pub fn get(&self, class: RegisterClass) -> &RegisterTable {
        match class {
            RegisterClass::Mc => &self.mc,
            RegisterClass::Emc => &self.emc,
        }
    }

    fn get_mut(&mut self, class: RegisterClass) -> &mut RegisterTable {
        match class {
            RegisterClass::Mc => &mut self.mc,
            RegisterClass::Emc => &mut self.emc,
        }
    }
}

/// Base latency label to the register tables recorded under it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    pub latencies: BTreeMap<String, ClassTables>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }

    /// Series of one register, if any dump supplied it
    pub fn series(
        &self,
        base_latency: &str,
        class: RegisterClass,
        register: &str,
    ) -> Option<&FrequencySeries> {
        self.latencies.get(base_latency)?.get(class).get(register)
    }

    /// Record every register of one dump at `frequency`, overwriting earlier values
    pub fn record(
        &mut self,
        base_latency: &str,
        class: RegisterClass,
        frequency: u32,
        registers: impl IntoIterator<Item = (String, u64)>,
    ) {
        let table = self
            .latencies
            .entry(base_latency.to_string())
            .or_default()
            .get_mut(class);
        for (name, value) in registers {
            table.entry(name).or_default().insert(frequency, value);
        }
    }
}

/// Extract the frequency embedded in a dump file name
///
/// # Example
/// ```
/// use regfit::archive::frequency_from_name;
///
/// assert_eq!(frequency_from_name("1600_emc.txt"), Some(1600));
/// assert_eq!(frequency_from_name("emc_dump.txt"), None);
/// ```
pub fn frequency_from_name(name: &str) -> Option<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit pattern"));
    digits.find(name)?.as_str().parse().ok()
}

/// Walk an extracted dump tree and collect every register series
pub fn analyze_dir<P: AsRef<Path>>(root: P) -> Result<AnalysisResult, ArchiveError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(ArchiveError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ArchiveError::NotADirectory(root.to_path_buf()));
    }

    let base_dirs = sorted_entries(root).map_err(|source| ArchiveError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut result = AnalysisResult::default();
    for base_dir in base_dirs.into_iter().filter(|p| p.is_dir()) {
        let Some(base_latency) = base_dir.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        result.latencies.entry(base_latency.clone()).or_default();

        for class in RegisterClass::ALL {
            let class_dir = base_dir.join(class.dir_name());
            if !class_dir.is_dir() {
                tracing::debug!("No {} directory under {}", class, base_dir.display());
                continue;
            }
            collect_class_dir(&mut result, &base_latency, class, &class_dir);
        }
    }

    tracing::debug!(
        "Collected {} base latencies from {}",
        result.latencies.len(),
        root.display()
    );
    Ok(result)
}

fn collect_class_dir(
    result: &mut AnalysisResult,
    base_latency: &str,
    class: RegisterClass,
    class_dir: &Path,
) {
    let dumps = match sorted_entries(class_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to list {}: {}", class_dir.display(), e);
            return;
        }
    };

    for dump in dumps {
        if !dump.is_file() || dump.extension().and_then(|e| e.to_str()) != Some(DUMP_EXTENSION) {
            continue;
        }
        let Some(name) = dump.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(frequency) = frequency_from_name(name) else {
            tracing::debug!("Skipping {}: no frequency in file name", dump.display());
            continue;
        };

        let registers = parse_dump_file(&dump);
        tracing::trace!(
            "{} -> {} registers at {} MHz",
            dump.display(),
            registers.len(),
            frequency
        );
        result.record(base_latency, class, frequency, registers);
    }
}

/// Directory entries sorted by path so later-wins overwrites are reproducible
fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
