//! Directory Walker
//!
//! Visits a directory tree with an explicit worklist instead of recursion.
//! Each directory's entries are listed in file-name order and handled in
//! fixed-size batches; files go to a [`FileProcessor`], sub-directories are
//! queued one level deeper until the depth limit.

use crate::config::{BATCH_SIZE, MAX_DEPTH};
use crate::gate::RejectReason;
use shared_utils::{BatchResult, LowqError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Every derivative already exists
    OutputsExist,
    /// Size guard rejected every candidate output
    NotSmaller,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written {
        outputs: Vec<PathBuf>,
        input_bytes: u64,
        output_bytes: u64,
    },
    Skipped(SkipReason),
    /// Not an input at all (wrong extension, or itself a derivative)
    Ignored(RejectReason),
    Failed(String),
}

/// Per-file work plugged into the walker.
pub trait FileProcessor {
    /// Called once per directory, before its files, with every entry the
    /// walker listed there.
    fn enter_directory(&mut self, _dir: &Path, _entries: &[PathBuf]) {}

    fn process(&mut self, path: &Path) -> FileOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub recursive: bool,
    pub max_depth: usize,
    pub batch_size: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: MAX_DEPTH,
            batch_size: BATCH_SIZE,
        }
    }
}

impl WalkOptions {
    pub fn recursive(recursive: bool) -> Self {
        Self {
            recursive,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct TraversalTask {
    dir: PathBuf,
    depth: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    is_dir: bool,
}

/// One directory level, sorted by file name. Symlinks are not followed, so a
/// link is listed as a non-directory entry.
fn list_entries(dir: &Path) -> Result<Vec<Entry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            entry.map(|e| Entry {
                is_dir: e.file_type().is_dir(),
                path: e.into_path(),
            })
        })
        .collect::<std::result::Result<Vec<_>, walkdir::Error>>()
        .map_err(|e| LowqError::ReadDir {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })
}

fn record(result: &mut BatchResult, path: &Path, outcome: FileOutcome) {
    match outcome {
        FileOutcome::Written {
            input_bytes,
            output_bytes,
            ..
        } => result.success(input_bytes, output_bytes),
        FileOutcome::Skipped(_) => result.skip(),
        FileOutcome::Ignored(_) => {}
        FileOutcome::Failed(message) => result.fail(path.to_path_buf(), message),
    }
}

/// Returns the sub-directories to visit next, in listing order.
fn visit_directory<P: FileProcessor>(
    task: &TraversalTask,
    options: &WalkOptions,
    processor: &mut P,
    result: &mut BatchResult,
) -> Vec<TraversalTask> {
    if !task.dir.is_dir() {
        let err = LowqError::DirectoryNotFound(task.dir.clone());
        error!(dir = %task.dir.display(), "❌ {}", err);
        result.directory_failed(task.dir.clone(), err.to_string());
        return Vec::new();
    }

    info!(dir = %task.dir.display(), depth = task.depth, "📂 Processing directory");
    result.directory_visited();

    let entries = match list_entries(&task.dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %task.dir.display(), error = %e, "❌ Failed to list directory");
            result.directory_failed(task.dir.clone(), e.to_string());
            return Vec::new();
        }
    };

    let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
    processor.enter_directory(&task.dir, &paths);

    let mut children = Vec::new();
    for (index, batch) in entries.chunks(options.batch_size.max(1)).enumerate() {
        debug!(dir = %task.dir.display(), batch = index + 1, entries = batch.len(), "Batch");

        for entry in batch {
            if entry.is_dir {
                if !options.recursive {
                    continue;
                }
                let depth = task.depth + 1;
                if depth > options.max_depth {
                    warn!(
                        dir = %entry.path.display(),
                        max_depth = options.max_depth,
                        "⚠️ Maximum depth exceeded, not descending"
                    );
                    continue;
                }
                children.push(TraversalTask {
                    dir: entry.path.clone(),
                    depth,
                });
            } else {
                let outcome = processor.process(&entry.path);
                record(result, &entry.path, outcome);
            }
        }
    }

    info!(dir = %task.dir.display(), "✅ Directory done");
    children
}

/// Walk `root` depth-first. A directory's own files are handled before any
/// of its sub-directories.
pub fn walk<P: FileProcessor>(root: &Path, options: &WalkOptions, processor: &mut P) -> BatchResult {
    let mut result = BatchResult::new();
    let mut stack = vec![TraversalTask {
        dir: root.to_path_buf(),
        depth: 0,
    }];

    while let Some(task) = stack.pop() {
        let children = visit_directory(&task, options, processor, &mut result);
        // reversed so the first child is popped first
        stack.extend(children.into_iter().rev());
    }

    result
}
