//! img_lowq - low-quality / WebP derivatives for image trees
//!
//! Walks a directory, and for every JPEG, PNG or HEIC image writes a smaller
//! derivative next to it (`<stem>_low.<ext>` or `<stem>_low.webp`). Existing
//! derivatives are never overwritten, so runs can be repeated safely.

pub mod args;
pub mod codec;
pub mod config;
pub mod gate;
pub mod heic;
pub mod resize;
pub mod transcoder;
pub mod walker;

pub use args::{resolve_args, ArgsError, ResolvedArgs, USAGE};
pub use config::RunConfig;
pub use gate::{OutputPolicy, PROCESSED_MARKER};
pub use transcoder::Transcoder;
pub use walker::{walk, FileOutcome, FileProcessor, SkipReason, WalkOptions};

pub use shared_utils::{BatchResult, LowqError, Result};

use tracing::info;

/// Process `config.directory` once. Per-file and per-directory failures are
/// counted in the returned result, never raised.
pub fn run(config: &RunConfig) -> BatchResult {
    codec::init();
    let mut transcoder = Transcoder::from_config(config);
    info!(
        directory = %config.directory.display(),
        quality = transcoder.quality(),
        recursive = config.recursive,
        policy = %transcoder.policy(),
        size_guard = config.size_guard,
        "🚀 Starting"
    );
    walk(
        &config.directory,
        &WalkOptions::recursive(config.recursive),
        &mut transcoder,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_on_empty_directory() {
        let dir = TempDir::new().unwrap();
        let result = run(&RunConfig::new(dir.path()));
        assert_eq!(result.total, 0);
        assert_eq!(result.directories_visited, 1);
        assert_eq!(result.directory_errors, 0);
    }

    #[test]
    fn test_run_on_missing_directory_is_counted() {
        let result = run(&RunConfig::new("/no/such/img_lowq/root"));
        assert_eq!(result.directory_errors, 1);
        assert_eq!(result.total, 0);
    }
}
