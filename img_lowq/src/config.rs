//! Run configuration and the fixed limits of the pipeline.

use crate::gate::OutputPolicy;
use std::path::PathBuf;

pub const DEFAULT_QUALITY: i64 = 40;

/// Directories deeper than this below the root are not visited.
pub const MAX_DEPTH: usize = 20;

/// Directory entries are handled in chunks of this many.
pub const BATCH_SIZE: usize = 10;

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub directory: PathBuf,
    /// Raw quality as given; clamped into 1..=100 by the codec layer.
    pub quality: i64,
    pub recursive: bool,
    pub policy: OutputPolicy,
    pub size_guard: bool,
    pub verbose: bool,
    pub json: bool,
    pub log_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            quality: DEFAULT_QUALITY,
            recursive: true,
            policy: OutputPolicy::default(),
            size_guard: false,
            verbose: false,
            json: false,
            log_dir: None,
        }
    }
}
