//! Batch Processing Module
//!
//! Per-run accounting for batch file processing: how many files were written,
//! skipped or failed, and how many bytes went in and came out.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<(PathBuf, String)>,
    /// Bytes of sources that produced at least one derivative
    pub input_bytes: u64,
    /// Bytes of all derivatives written
    pub output_bytes: u64,
    pub directories_visited: usize,
    pub directory_errors: usize,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            input_bytes: 0,
            output_bytes: 0,
            directories_visited: 0,
            directory_errors: 0,
        }
    }

    pub fn success(&mut self, input_bytes: u64, output_bytes: u64) {
        self.total += 1;
        self.succeeded += 1;
        self.input_bytes += input_bytes;
        self.output_bytes += output_bytes;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn directory_visited(&mut self) {
        self.directories_visited += 1;
    }

    /// A directory that could not be listed. Not counted as a file.
    pub fn directory_failed(&mut self, path: PathBuf, error: String) {
        self.directory_errors += 1;
        self.errors.push((path, error));
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    /// Percentage of input bytes saved by the written derivatives.
    pub fn savings_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            (1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0
        }
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
