//! Shared Utilities for img_lowq
//!
//! - Logging setup (tracing + rolling file)
//! - Error type shared by the pipeline
//! - Batch accounting and end-of-run report
//! - Path/extension helpers and a type-safe file size

pub mod batch;
pub mod common_utils;
pub mod img_errors;
pub mod logging;
pub mod report;
pub mod types;

pub use batch::BatchResult;
pub use img_errors::{LowqError, Result};
pub use report::{print_summary_json, print_summary_report, RunSummary};
pub use types::FileSize;
