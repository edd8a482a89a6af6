//! Image Transcoder
//!
//! Turns one admitted source into its missing derivatives:
//!
//! - JPEG/PNG: decode, shrink by [`RASTER_SCALE`] past [`RASTER_RESIZE_THRESHOLD`],
//!   encode per target.
//! - HEIC: decode to an intermediate JPEG first. The low derivative is sized
//!   from the intermediate's header ([`HEIC_RESIZE_THRESHOLD`], [`HEIC_SCALE`]);
//!   under the WebP policy a full-size WebP at [`heic::HIGH_QUALITY`] is added.
//!   Same-format HEIC output that cannot be encoded is written as `<stem>_low.jpg`.
//!
//! With the size guard on, a low derivative that is not strictly smaller than
//! its source gets one more try at half size and capped quality, and is
//! dropped if that is not smaller either.

use crate::codec;
use crate::config::RunConfig;
use crate::gate::{
    self, DerivativeKind, DirListing, FileCandidate, GateDecision, OutputPolicy, OutputTarget,
    RejectReason, TargetFormat,
};
use crate::heic;
use crate::resize::{
    self, Dimensions, AGGRESSIVE_SCALE, HEIC_RESIZE_THRESHOLD, HEIC_SCALE,
    RASTER_RESIZE_THRESHOLD, RASTER_SCALE,
};
use crate::walker::{FileOutcome, FileProcessor, SkipReason};
use image::{DynamicImage, ImageFormat};
use shared_utils::{FileSize, LowqError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Quality ceiling for the size guard's second pass.
pub const AGGRESSIVE_QUALITY_CAP: u8 = 20;

/// Result of holding encoded output against the source size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict<T> {
    Primary(T),
    Aggressive(T),
    Discarded { primary: FileSize, aggressive: FileSize },
}

/// Keep `primary` if strictly smaller than `input`, otherwise run the
/// `aggressive` pass and keep that if it is. The second pass only runs when
/// needed.
pub fn apply_size_guard<T, F>(input: FileSize, primary: T, aggressive: F) -> Result<GuardVerdict<T>>
where
    T: AsRef<[u8]>,
    F: FnOnce() -> Result<T>,
{
    let primary_size = FileSize::of(primary.as_ref());
    if primary_size.is_smaller_than(input) {
        return Ok(GuardVerdict::Primary(primary));
    }

    let second = aggressive()?;
    let second_size = FileSize::of(second.as_ref());
    if second_size.is_smaller_than(input) {
        Ok(GuardVerdict::Aggressive(second))
    } else {
        Ok(GuardVerdict::Discarded {
            primary: primary_size,
            aggressive: second_size,
        })
    }
}

/// Encoded bytes plus the name they are to be written under, which differs
/// from the planned target when the JPEG fallback kicked in.
#[derive(Debug, Clone)]
struct Encoded {
    file_name: String,
    bytes: Vec<u8>,
}

impl AsRef<[u8]> for Encoded {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Decoded source plus the geometry its low derivative is sized against.
struct Decoded {
    image: DynamicImage,
    reference: Dimensions,
    threshold: u32,
    factor: f64,
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    quality: u8,
    policy: OutputPolicy,
    size_guard: bool,
    /// Listing of the directory currently being processed, kept current as
    /// derivatives are written.
    listing: Option<(PathBuf, DirListing)>,
}

impl Transcoder {
    pub fn new(quality: i64, policy: OutputPolicy, size_guard: bool) -> Self {
        let clamped = codec::clamp_quality(quality);
        if i64::from(clamped) != quality {
            warn!(requested = quality, used = clamped, "⚠️ Quality out of range, clamped");
        }
        Self {
            quality: clamped,
            policy,
            size_guard,
            listing: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.quality, config.policy, config.size_guard)
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn policy(&self) -> OutputPolicy {
        self.policy
    }

    /// Gate, then transcode. Every failure is logged here and reported as
    /// [`FileOutcome::Failed`]; nothing propagates to the caller.
    pub fn process_file(&mut self, path: &Path) -> FileOutcome {
        let Some(candidate) = FileCandidate::from_path(path) else {
            debug!(path = %path.display(), "Skipping entry without a UTF-8 file name");
            return FileOutcome::Ignored(RejectReason::UnsupportedExtension);
        };
        if let Err(reason) = gate::check_candidate(&candidate) {
            debug!(file = %candidate.file_name, %reason, "Not an input");
            return FileOutcome::Ignored(reason);
        }

        let dir = candidate.directory().to_path_buf();
        let mut listing = match self.listing_for(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                error!(file = %candidate.path.display(), error = %e, "❌ Output directory unreadable");
                return FileOutcome::Failed(e.to_string());
            }
        };

        let outcome = self.gate_and_transcode(&candidate, &mut listing);
        self.listing = Some((dir, listing));
        outcome
    }

    /// The cached listing when it belongs to `dir`, otherwise a fresh read.
    fn listing_for(&mut self, dir: &Path) -> Result<DirListing> {
        match self.listing.take() {
            Some((cached, listing)) if cached.as_path() == dir => Ok(listing),
            _ => DirListing::read(dir),
        }
    }

    fn gate_and_transcode(&self, candidate: &FileCandidate, listing: &mut DirListing) -> FileOutcome {
        match gate::decide(candidate, self.policy, listing) {
            GateDecision::Rejected(reason) => {
                debug!(file = %candidate.file_name, %reason, "Not an input");
                FileOutcome::Ignored(reason)
            }
            GateDecision::AllExist(existing) => {
                info!(
                    "⏭️ {} → SKIP (exists: {})",
                    candidate.file_name,
                    target_names(&existing)
                );
                FileOutcome::Skipped(SkipReason::OutputsExist)
            }
            GateDecision::Pending { missing, existing } => {
                if !existing.is_empty() {
                    info!(
                        "⏭️ {} → already has {}",
                        candidate.file_name,
                        target_names(&existing)
                    );
                }
                info!(file = %candidate.path.display(), outputs = %target_names(&missing), "🔄 Processing");

                match self.transcode(candidate, &missing, listing) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(file = %candidate.path.display(), error = %e, "❌ Processing failed");
                        FileOutcome::Failed(e.to_string())
                    }
                }
            }
        }
    }

    fn transcode(
        &self,
        candidate: &FileCandidate,
        missing: &[OutputTarget],
        listing: &mut DirListing,
    ) -> Result<FileOutcome> {
        let source = fs::read(&candidate.path).map_err(|source| LowqError::ReadFile {
            path: candidate.path.clone(),
            source,
        })?;
        let input = FileSize::of(&source);

        let decoded = if candidate.is_heic() {
            let intermediate = heic::decode_to_jpeg(&source, heic::INTERMEDIATE_QUALITY)?;
            let reference = heic::intermediate_dimensions(&intermediate);
            Decoded {
                image: codec::decode_as(&intermediate, ImageFormat::Jpeg)?,
                reference,
                threshold: HEIC_RESIZE_THRESHOLD,
                factor: HEIC_SCALE,
            }
        } else {
            let image = codec::decode(&source)?;
            Decoded {
                reference: codec::dimensions_of(&image),
                image,
                threshold: RASTER_RESIZE_THRESHOLD,
                factor: RASTER_SCALE,
            }
        };
        drop(source);

        let directory = candidate.directory();
        let mut outputs: Vec<PathBuf> = Vec::with_capacity(missing.len());
        let mut output_bytes = 0u64;

        for target in missing {
            let encoded = match target.kind {
                DerivativeKind::High => Some(Encoded {
                    file_name: target.file_name.clone(),
                    bytes: codec::encode_webp(&decoded.image, heic::HIGH_QUALITY)?,
                }),
                DerivativeKind::Low => self.encode_low(candidate, &decoded, target, input, listing)?,
            };
            let Some(encoded) = encoded else {
                continue;
            };

            let path = directory.join(&encoded.file_name);
            codec::write_atomic(&path, &encoded.bytes)?;
            listing.insert(&encoded.file_name);

            let size = FileSize::of(&encoded.bytes);
            info!(
                "✅ {} → {} ({} → {}, {:+.1}%)",
                candidate.file_name,
                encoded.file_name,
                input,
                size,
                -size.savings_percent(input).unwrap_or(0.0)
            );
            output_bytes += size.bytes();
            outputs.push(path);
        }

        if outputs.is_empty() {
            return Ok(FileOutcome::Skipped(SkipReason::NotSmaller));
        }
        Ok(FileOutcome::Written {
            outputs,
            input_bytes: input.bytes(),
            output_bytes,
        })
    }

    /// `None` when the size guard threw the output away.
    fn encode_low(
        &self,
        candidate: &FileCandidate,
        decoded: &Decoded,
        target: &OutputTarget,
        input: FileSize,
        listing: &DirListing,
    ) -> Result<Option<Encoded>> {
        let actual = codec::dimensions_of(&decoded.image);
        let size = resize::target_size(actual, decoded.reference, decoded.threshold, decoded.factor);
        if let Some(size) = size {
            debug!(file = %candidate.file_name, from = %actual, to = %size, "Resizing");
        }

        let primary = self.encode_target(candidate, &decoded.image, size, target, self.quality, listing)?;
        if !self.size_guard {
            return Ok(Some(primary));
        }

        let verdict = apply_size_guard(input, primary, || {
            let half = resize::fit_inside(actual, actual.scaled(AGGRESSIVE_SCALE));
            let quality = self.quality.min(AGGRESSIVE_QUALITY_CAP);
            debug!(file = %candidate.file_name, size = %half, quality, "Size guard: aggressive pass");
            let size = (half != actual).then_some(half);
            self.encode_target(candidate, &decoded.image, size, target, quality, listing)
        })?;

        match verdict {
            GuardVerdict::Primary(encoded) => Ok(Some(encoded)),
            GuardVerdict::Aggressive(encoded) => {
                info!(file = %candidate.file_name, "📉 Size guard: kept aggressive pass");
                Ok(Some(encoded))
            }
            GuardVerdict::Discarded {
                primary,
                aggressive,
            } => {
                warn!(
                    "⏭️ {} → {} discarded: not smaller than source ({} / {} vs {})",
                    candidate.file_name, target.file_name, primary, aggressive, input
                );
                Ok(None)
            }
        }
    }

    fn encode_target(
        &self,
        candidate: &FileCandidate,
        image: &DynamicImage,
        size: Option<Dimensions>,
        target: &OutputTarget,
        quality: u8,
        listing: &DirListing,
    ) -> Result<Encoded> {
        let scaled;
        let image = match size {
            Some(size) => {
                scaled = codec::resized(image, size);
                &scaled
            }
            None => image,
        };

        if target.format != TargetFormat::Heic {
            return Ok(Encoded {
                file_name: target.file_name.clone(),
                bytes: codec::encode(image, target.format, quality)?,
            });
        }
        encode_heic_or_jpeg(candidate, image, target, quality, listing, heic::encode)
    }
}

/// HEIC at the boosted quality, or `<stem>_low.jpg` at `quality` when the
/// HEIC encoder fails. An existing fallback file turns the failure into an
/// error rather than a second fallback.
fn encode_heic_or_jpeg<F>(
    candidate: &FileCandidate,
    image: &DynamicImage,
    target: &OutputTarget,
    quality: u8,
    listing: &DirListing,
    encode_heic: F,
) -> Result<Encoded>
where
    F: FnOnce(&DynamicImage, u8) -> Result<Vec<u8>>,
{
    match encode_heic(image, heic::boosted_quality(quality)) {
        Ok(bytes) => Ok(Encoded {
            file_name: target.file_name.clone(),
            bytes,
        }),
        Err(e) => {
            let fallback = gate::jpeg_fallback_target(candidate);
            if listing.contains(&fallback.file_name) {
                return Err(e);
            }
            warn!(
                file = %candidate.file_name,
                error = %e,
                fallback = %fallback.file_name,
                "⚠️ HEIC encoding failed, writing JPEG instead"
            );
            Ok(Encoded {
                file_name: fallback.file_name,
                bytes: codec::encode_jpeg(image, quality)?,
            })
        }
    }
}

impl FileProcessor for Transcoder {
    fn enter_directory(&mut self, dir: &Path, entries: &[PathBuf]) {
        self.listing = Some((dir.to_path_buf(), DirListing::from_paths(entries)));
    }

    fn process(&mut self, path: &Path) -> FileOutcome {
        self.process_file(path)
    }
}

fn target_names(targets: &[OutputTarget]) -> String {
    targets
        .iter()
        .map(|t| t.file_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
