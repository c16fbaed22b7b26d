// Integration test utilities
//
// Builds extracted dump trees on disk:
// <root>/<base_latency>/<mc|emc>/<file>

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Temporary dump tree, removed on drop
pub struct DumpTree {
    dir: TempDir,
}

impl DumpTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file at `<base_latency>/<class>/<name>`
    pub fn dump(&self, base_latency: &str, class: &str, name: &str, content: &str) -> &Self {
        let dir = self.dir.path().join(base_latency).join(class);
        fs::create_dir_all(&dir).expect("create class dir");
        fs::write(dir.join(name), content).expect("write dump");
        self
    }

    /// Write one dump per frequency holding a single register
    pub fn series(
        &self,
        base_latency: &str,
        class: &str,
        register: &str,
        points: &[(u32, u64)],
    ) -> &Self {
        for (freq, value) in points {
            let name = format!("{freq}_{class}.txt");
            let path = self.dir.path().join(base_latency).join(class).join(&name);
            let mut content = fs::read_to_string(&path).unwrap_or_default();
            content.push_str(&format!("{register} 0x{value:08x}\n"));
            self.dump(base_latency, class, &name, &content);
        }
        self
    }
}

/// The two-regime series used across tests: slope 0.1 up to 300 MHz, 0.3 after
pub const TWO_REGIMES: [(u32, u64); 5] = [(100, 10), (200, 20), (300, 30), (400, 60), (500, 90)];
