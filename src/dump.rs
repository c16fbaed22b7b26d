//! Register dump parsing
//!
//! A dump is plain text with one `name ... 0xVALUE` record per line. Blank lines
//! and `#` comments are ignored. Parsing is best-effort: lines that do not look
//! like register records are skipped, and unreadable files parse as empty.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Register name to raw value, for one dump file
pub type RegisterDump = BTreeMap<String, u64>;

/// Register name prefixes accepted by the parser (compared lower-cased)
const REGISTER_PREFIXES: [&str; 2] = ["emc_", "mc_"];

/// Memory-controller register set a dump belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RegisterClass {
    Mc,
    Emc,
}

impl RegisterClass {
    /// Both classes, in the order they are scanned and reported
    pub const ALL: [RegisterClass; 2] = [RegisterClass::Mc, RegisterClass::Emc];

    /// Directory name holding dumps of this class
    pub fn dir_name(self) -> &'static str {
        match self {
            RegisterClass::Mc => "mc",
            RegisterClass::Emc => "emc",
        }
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Parse the text of one dump
///
/// The first whitespace-separated field is the register name and the last one
/// is the value, so anything in between (widths, offsets) is ignored.
///
/// # Example
/// ```
/// use regfit::dump::parse_dump;
///
/// let regs = parse_dump("# header\nEMC_RC  0x0000002a\nfoo 0x1\n");
/// assert_eq!(regs.get("EMC_RC"), Some(&42));
/// assert_eq!(regs.len(), 1);
/// ```
pub fn parse_dump(content: &str) -> RegisterDump {
    let mut registers = RegisterDump::new();

    for line in content.lines() {
        if let Some((name, value)) = parse_line(line) {
            registers.insert(name.to_string(), value);
        }
    }

    registers
}

/// Parse raw dump bytes, dropping any sequence that is not valid UTF-8
pub fn parse_dump_bytes(bytes: &[u8]) -> RegisterDump {
    parse_dump(&decode_ignoring_invalid(bytes))
}

/// Decode UTF-8, skipping invalid sequences instead of substituting them
fn decode_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                return text;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to marks a checked UTF-8 prefix
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // Truncated sequence at end of input
                    None => return text,
                }
            }
        }
    }
}

/// Parse one dump file, yielding an empty dump if it cannot be read
///
/// Bytes that are not valid UTF-8 are dropped.
pub fn parse_dump_file<P: AsRef<Path>>(path: P) -> RegisterDump {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(bytes) => parse_dump_bytes(&bytes),
        Err(e) => {
            tracing::warn!("Failed to read dump {}: {}", path.display(), e);
            RegisterDump::new()
        }
    }
}

fn parse_line(line: &str) -> Option<(&str, u64)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split_whitespace();
    let name = fields.next()?;
    let token = fields.next_back()?;

    if !is_register_name(name) {
        return None;
    }

    let value = parse_hex(token)?;
    Some((name, value))
}

fn is_register_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    REGISTER_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Parse a `0x`-prefixed hexadecimal literal
fn parse_hex(token: &str) -> Option<u64> {
    let digits = token.strip_prefix("0x")?;
    // from_str_radix alone would also accept a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
