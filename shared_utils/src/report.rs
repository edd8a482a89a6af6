//! Report Module
//!
//! End-of-run summary for batch operations, as a boxed terminal report or JSON.

use crate::batch::BatchResult;
use crate::types::FileSize;
use chrono::{DateTime, Local};
use console::style;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub operation: String,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: f64,
    pub directories_visited: usize,
    pub directory_errors: usize,
    pub files_seen: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub savings_percent: f64,
    pub success_rate: f64,
    pub errors: Vec<ErrorEntry>,
}

impl RunSummary {
    pub fn from_batch(
        operation: &str,
        started_at: DateTime<Local>,
        elapsed: Duration,
        result: &BatchResult,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            directories_visited: result.directories_visited,
            directory_errors: result.directory_errors,
            files_seen: result.total,
            written: result.succeeded,
            skipped: result.skipped,
            failed: result.failed,
            input_bytes: result.input_bytes,
            output_bytes: result.output_bytes,
            savings_percent: result.savings_percent(),
            success_rate: result.success_rate(),
            errors: result
                .errors
                .iter()
                .map(|(path, message)| ErrorEntry {
                    path: path.display().to_string(),
                    message: message.clone(),
                })
                .collect(),
        }
    }
}

pub fn format_duration(secs: f64) -> String {
    if secs >= 3600.0 {
        let h = (secs / 3600.0).floor() as u32;
        let m = ((secs % 3600.0) / 60.0).floor() as u32;
        let s = (secs % 60.0).floor() as u32;
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if secs >= 60.0 {
        let m = (secs / 60.0).floor() as u32;
        let s = (secs % 60.0).floor() as u32;
        format!("{}m {:02}s", m, s)
    } else {
        format!("{:.1}s", secs)
    }
}

pub fn print_summary_report(summary: &RunSummary) {
    let rule = "═".repeat(60);
    println!();
    println!("╔{}╗", rule);
    println!(
        "  📊 {} Summary ({})",
        style(&summary.operation).bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("╠{}╣", rule);
    println!("  📂 Directories:        {:>10}", summary.directories_visited);
    println!("  📁 Files Seen:         {:>10}", summary.files_seen);
    println!(
        "  ✅ Written:            {:>10}",
        style(summary.written).green()
    );
    println!("  ⏭️  Skipped:            {:>10}", summary.skipped);
    println!("  🎯 Success Rate:       {:>9.1}%", summary.success_rate);
    if summary.failed > 0 || summary.directory_errors > 0 {
        println!(
            "  ❌ Failed:             {:>10}",
            style(summary.failed + summary.directory_errors).red()
        );
    } else {
        println!("  ❌ Failed:             {:>10}", 0);
    }
    println!("╠{}╣", rule);
    println!(
        "  💾 Input Size:         {:>10}",
        FileSize::new(summary.input_bytes)
    );
    println!(
        "  💾 Output Size:        {:>10}",
        FileSize::new(summary.output_bytes)
    );
    println!("  📉 Savings:            {:>9.1}%", summary.savings_percent);
    println!(
        "  ⏱️  Total Time:         {:>10}",
        format_duration(summary.elapsed_secs)
    );
    println!("╚{}╝", rule);

    if !summary.errors.is_empty() {
        println!();
        println!("{}", style("❌ Errors encountered:").red());
        for entry in &summary.errors {
            println!("   {} → {}", entry.path, entry.message);
        }
    }
}

pub fn print_summary_json(summary: &RunSummary) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
