//! Idempotence Gate
//!
//! Decides, from file names alone, whether a directory entry is an input and
//! which derivatives still have to be produced for it. The presence of a
//! derivative in the source's directory (compared case-insensitively) is the
//! only record of earlier work.

use clap::ValueEnum;
use shared_utils::common_utils::{contains_ignore_case, get_extension_lowercase, has_extension};
use shared_utils::{LowqError, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Substring that marks a generated derivative. Stems containing it are
/// never inputs.
pub const PROCESSED_MARKER: &str = "_low";

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputPolicy {
    /// `<stem>_low<ext>` in the source's own format
    SameFormat,
    /// `<stem>_low.webp`; HEIC sources also get a full-quality `<stem>.webp`
    #[default]
    Webp,
}

impl fmt::Display for OutputPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPolicy::SameFormat => write!(f, "same-format"),
            OutputPolicy::Webp => write!(f, "webp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpeg,
    Png,
    Heic,
    Webp,
}

impl TargetFormat {
    pub fn from_extension(ext_lower: &str) -> Option<Self> {
        match ext_lower {
            "jpg" | "jpeg" => Some(TargetFormat::Jpeg),
            "png" => Some(TargetFormat::Png),
            "heic" => Some(TargetFormat::Heic),
            "webp" => Some(TargetFormat::Webp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeKind {
    /// Full-size, high-quality transcode (HEIC → WebP only)
    High,
    /// Resized, requested-quality copy
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub kind: DerivativeKind,
    pub format: TargetFormat,
    pub file_name: String,
}

/// A directory entry split into the parts the gate reasons about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// Extension as written, without the dot
    pub extension: String,
    pub extension_lower: String,
    pub stem: String,
}

impl FileCandidate {
    /// `None` for paths without a UTF-8 file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = path.file_stem()?.to_str()?.to_string();

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            extension_lower: get_extension_lowercase(path),
            extension,
            stem,
        })
    }

    pub fn is_heic(&self) -> bool {
        self.extension_lower == "heic"
    }

    pub fn source_format(&self) -> Option<TargetFormat> {
        TargetFormat::from_extension(&self.extension_lower)
    }

    /// Directory the derivatives are written to.
    pub fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedExtension,
    AlreadyDerived,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedExtension => write!(f, "unsupported extension"),
            RejectReason::AlreadyDerived => {
                write!(f, "name contains '{}' marker", PROCESSED_MARKER)
            }
        }
    }
}

pub fn check_candidate(candidate: &FileCandidate) -> std::result::Result<(), RejectReason> {
    if !has_extension(&candidate.path, SUPPORTED_EXTENSIONS) {
        return Err(RejectReason::UnsupportedExtension);
    }
    if contains_ignore_case(&candidate.stem, PROCESSED_MARKER) {
        return Err(RejectReason::AlreadyDerived);
    }
    Ok(())
}

/// The derivatives a candidate should end up with under `policy`.
/// Only meaningful for candidates that passed [`check_candidate`].
pub fn plan_targets(candidate: &FileCandidate, policy: OutputPolicy) -> Vec<OutputTarget> {
    let low_name = |ext: &str| format!("{}{}.{}", candidate.stem, PROCESSED_MARKER, ext);

    match policy {
        OutputPolicy::SameFormat => {
            let format = candidate.source_format().unwrap_or(TargetFormat::Jpeg);
            vec![OutputTarget {
                kind: DerivativeKind::Low,
                format,
                file_name: low_name(&candidate.extension),
            }]
        }
        OutputPolicy::Webp => {
            let mut targets = Vec::with_capacity(2);
            if candidate.is_heic() {
                targets.push(OutputTarget {
                    kind: DerivativeKind::High,
                    format: TargetFormat::Webp,
                    file_name: format!("{}.webp", candidate.stem),
                });
            }
            targets.push(OutputTarget {
                kind: DerivativeKind::Low,
                format: TargetFormat::Webp,
                file_name: low_name("webp"),
            });
            targets
        }
    }
}

/// Where a same-format HEIC derivative goes when HEIC encoding fails.
pub fn jpeg_fallback_target(candidate: &FileCandidate) -> OutputTarget {
    OutputTarget {
        kind: DerivativeKind::Low,
        format: TargetFormat::Jpeg,
        file_name: format!("{}{}.jpg", candidate.stem, PROCESSED_MARKER),
    }
}

/// Lower-cased names of a directory's entries.
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    names: HashSet<String>,
}

impl DirListing {
    pub fn read(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| LowqError::ReadDir {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut names = HashSet::new();
        for entry in entries {
            let entry = entry?;
            names.insert(entry.file_name().to_string_lossy().to_lowercase());
        }
        Ok(Self { names })
    }

    /// Listing built from paths already read by the caller.
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        Self {
            names: paths
                .into_iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_lowercase())
                .collect(),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_lowercase());
    }
}

#[derive(Debug, Clone)]
pub enum GateDecision {
    Rejected(RejectReason),
    /// Every derivative is already present; the source must not be touched.
    AllExist(Vec<OutputTarget>),
    Pending {
        missing: Vec<OutputTarget>,
        existing: Vec<OutputTarget>,
    },
}

/// Pure decision against an already-read listing of the candidate's directory.
pub fn decide(candidate: &FileCandidate, policy: OutputPolicy, listing: &DirListing) -> GateDecision {
    if let Err(reason) = check_candidate(candidate) {
        return GateDecision::Rejected(reason);
    }

    // An earlier JPEG fallback stands in for the same-format HEIC derivative
    let fallback = (policy == OutputPolicy::SameFormat && candidate.is_heic())
        .then(|| jpeg_fallback_target(candidate).file_name);
    let present = |t: &OutputTarget| {
        listing.contains(&t.file_name)
            || (t.format == TargetFormat::Heic
                && fallback.as_deref().is_some_and(|name| listing.contains(name)))
    };

    let (existing, missing): (Vec<_>, Vec<_>) = plan_targets(candidate, policy)
        .into_iter()
        .partition(|t| present(t));

    if missing.is_empty() {
        GateDecision::AllExist(existing)
    } else {
        GateDecision::Pending { missing, existing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn candidate(path: &str) -> FileCandidate {
        FileCandidate::from_path(Path::new(path)).unwrap()
    }

    fn names(targets: &[OutputTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.file_name.as_str()).collect()
    }

    #[test]
    fn test_candidate_parts() {
        let c = candidate("/photos/trip/IMG_0001.JPG");
        assert_eq!(c.file_name, "IMG_0001.JPG");
        assert_eq!(c.extension, "JPG");
        assert_eq!(c.extension_lower, "jpg");
        assert_eq!(c.stem, "IMG_0001");
        assert_eq!(c.directory(), Path::new("/photos/trip"));
        assert!(!c.is_heic());

        assert_eq!(candidate("bare.png").directory(), Path::new("."));
    }

    #[test]
    fn test_rejects_unsupported_and_derived() {
        assert_eq!(
            check_candidate(&candidate("notes.txt")),
            Err(RejectReason::UnsupportedExtension)
        );
        assert_eq!(
            check_candidate(&candidate("a.webp")),
            Err(RejectReason::UnsupportedExtension)
        );
        assert_eq!(
            check_candidate(&candidate("README")),
            Err(RejectReason::UnsupportedExtension)
        );
        assert_eq!(
            check_candidate(&candidate("a_low.jpg")),
            Err(RejectReason::AlreadyDerived)
        );
        assert_eq!(
            check_candidate(&candidate("a_LOW_copy.PNG")),
            Err(RejectReason::AlreadyDerived)
        );
        assert_eq!(check_candidate(&candidate("a.HeIc")), Ok(()));
        assert_eq!(check_candidate(&candidate("lowkey.jpeg")), Ok(()));
    }

    #[test]
    fn test_same_format_naming_keeps_extension_text() {
        let targets = plan_targets(&candidate("a.jpg"), OutputPolicy::SameFormat);
        assert_eq!(names(&targets), vec!["a_low.jpg"]);
        assert_eq!(targets[0].format, TargetFormat::Jpeg);

        let targets = plan_targets(&candidate("B.JPEG"), OutputPolicy::SameFormat);
        assert_eq!(names(&targets), vec!["B_low.JPEG"]);

        let targets = plan_targets(&candidate("c.heic"), OutputPolicy::SameFormat);
        assert_eq!(names(&targets), vec!["c_low.heic"]);
        assert_eq!(targets[0].format, TargetFormat::Heic);

        let targets = plan_targets(&candidate("d.png"), OutputPolicy::SameFormat);
        assert_eq!(targets[0].format, TargetFormat::Png);
    }

    #[test]
    fn test_webp_naming() {
        let targets = plan_targets(&candidate("a.png"), OutputPolicy::Webp);
        assert_eq!(names(&targets), vec!["a_low.webp"]);
        assert_eq!(targets[0].kind, DerivativeKind::Low);

        let targets = plan_targets(&candidate("b.heic"), OutputPolicy::Webp);
        assert_eq!(names(&targets), vec!["b.webp", "b_low.webp"]);
        assert_eq!(targets[0].kind, DerivativeKind::High);
        assert_eq!(targets[1].kind, DerivativeKind::Low);
    }

    #[test]
    fn test_jpeg_fallback_name() {
        assert_eq!(jpeg_fallback_target(&candidate("c.heic")).file_name, "c_low.jpg");
    }

    #[test]
    fn test_decide_case_insensitive_existence() {
        let c = candidate("/x/a.jpg");
        let listing = DirListing::from_names(["a.jpg", "A_LOW.JPG"]);
        match decide(&c, OutputPolicy::SameFormat, &listing) {
            GateDecision::AllExist(existing) => assert_eq!(names(&existing), vec!["a_low.jpg"]),
            other => panic!("expected AllExist, got {:?}", other),
        }
    }

    #[test]
    fn test_decide_partial_heic_pair() {
        let c = candidate("/x/b.heic");
        let listing = DirListing::from_names(["b.heic", "B.webp"]);
        match decide(&c, OutputPolicy::Webp, &listing) {
            GateDecision::Pending {
                missing, existing, ..
            } => {
                assert_eq!(names(&missing), vec!["b_low.webp"]);
                assert_eq!(names(&existing), vec!["b.webp"]);
            }
            other => panic!("expected Pending, got {:?}", other),
        }
    }

    #[test]
    fn test_decide_counts_jpeg_fallback_for_heic() {
        let c = candidate("/x/c.heic");
        let listing = DirListing::from_names(["c.heic", "C_low.JPG"]);
        assert!(matches!(
            decide(&c, OutputPolicy::SameFormat, &listing),
            GateDecision::AllExist(_)
        ));
        // the fallback has no meaning under the WebP policy
        assert!(matches!(
            decide(&c, OutputPolicy::Webp, &listing),
            GateDecision::Pending { .. }
        ));
    }

    #[test]
    fn test_decide_rejects_before_looking_at_listing() {
        let c = candidate("/x/a_low.jpg");
        assert!(matches!(
            decide(&c, OutputPolicy::Webp, &DirListing::default()),
            GateDecision::Rejected(RejectReason::AlreadyDerived)
        ));
    }

    #[test]
    fn test_listing_read_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.heic"), b"not really heic").unwrap();
        fs::write(dir.path().join("b.webp"), b"x").unwrap();
        fs::write(dir.path().join("B_Low.WEBP"), b"x").unwrap();

        let c = FileCandidate::from_path(&dir.path().join("b.heic")).unwrap();
        let listing = DirListing::read(c.directory()).unwrap();
        assert!(matches!(
            decide(&c, OutputPolicy::Webp, &listing),
            GateDecision::AllExist(_)
        ));

        fs::remove_file(dir.path().join("B_Low.WEBP")).unwrap();
        let listing = DirListing::read(c.directory()).unwrap();
        match decide(&c, OutputPolicy::Webp, &listing) {
            GateDecision::Pending { missing, .. } => assert_eq!(names(&missing), vec!["b_low.webp"]),
            other => panic!("expected Pending, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_from_paths_matches_read() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A_LOW.JPG"), b"x").unwrap();
        let paths = vec![dir.path().join("a.jpg"), dir.path().join("A_LOW.JPG")];
        let listing = DirListing::from_paths(&paths);
        assert!(listing.contains("a_low.jpg"));
        assert!(listing.contains("A.JPG"));
        assert!(DirListing::read(dir.path()).unwrap().contains("a_low.jpg"));
    }

    #[test]
    fn test_listing_missing_directory_is_an_error() {
        let err = DirListing::read(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, LowqError::ReadDir { .. }));
    }

    #[test]
    fn test_listing_insert() {
        let mut listing = DirListing::default();
        assert!(!listing.contains("A.webp"));
        listing.insert("a.WEBP");
        assert!(listing.contains("A.webp"));
    }
}
