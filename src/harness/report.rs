//! JSONL trial-report sink: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object. Lines are assembled in
//! memory and written with a single `write_all` so a tailing consumer
//! never sees a partial record.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::errors::{EpyError, Result};
use crate::harness::runner::TrialReport;

/// Appends one [`TrialReport`] per line to a file, creating parent
/// directories and the file on first use.
#[derive(Debug, Clone)]
pub struct JsonlReporter {
    path: PathBuf,
}

impl JsonlReporter {
    /// Reporter writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single report as one JSONL line.
    pub fn append(&self, report: &TrialReport) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| EpyError::io(parent, source))?;
            }
        }
        let mut line = serde_json::to_string(report)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EpyError::io(&self.path, source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| EpyError::io(&self.path, source))?;
        Ok(())
    }
}
