//! Media pipeline
//!
//! Rewrites image entries of an extracted package in place:
//!
//! 1. **Scan**: read every media entry, unwrap the compression wrapper if
//!    present and sniff the codec. Unknown codecs are left untouched.
//! 2. **Transform**: decode, crop or mask, re-encode in the same codec.
//! 3. **Store**: re-wrap when the entry came wrapped and overwrite the file.
//!
//! A failure on one image is logged and counted; it never stops the batch.

pub mod asset;
pub mod codec;
pub mod compression;
pub mod geometry;

use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use asset::{MediaAsset, MediaEntry};
pub use codec::{Codec, CodecError};
pub use compression::CompressionError;
pub use geometry::{
    Corner, CropSpec, Edge, GeometryError, MaskColor, MaskSpec, Percent, Region,
};

/// Per-item media failure
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Geometric edit applied to every image of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MediaTransform {
    Crop(CropSpec),
    Mask(MaskSpec),
}

impl MediaTransform {
    /// Apply the transform to a decoded image
    pub fn apply(&self, image: DynamicImage) -> Result<DynamicImage, GeometryError> {
        match self {
            MediaTransform::Crop(spec) => geometry::crop(&image, spec),
            MediaTransform::Mask(spec) => {
                let mut image = image;
                geometry::mask(&mut image, spec);
                Ok(image)
            }
        }
    }

    /// Suffix appended to the input file stem for the output package
    pub fn output_suffix(&self) -> &'static str {
        match self {
            MediaTransform::Crop(_) => "_cropped",
            MediaTransform::Mask(_) => "_masked",
        }
    }

    /// One-line human description
    pub fn describe(&self) -> String {
        match self {
            MediaTransform::Crop(spec) => {
                format!("crop {} from the {}", spec.percent, spec.from)
            }
            MediaTransform::Mask(spec) => format!(
                "mask {} corner ({} x {}, {})",
                spec.corner, spec.width, spec.height, spec.color
            ),
        }
    }
}

/// A media item that failed to transform
#[derive(Debug, Clone, Serialize)]
pub struct MediaFailure {
    pub identifier: String,
    pub message: String,
}

/// Outcome of a media pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaReport {
    /// Media entries examined
    pub scanned: usize,
    /// Entries recognised as PNG, JPEG or AVIF
    pub images: usize,
    /// Images transformed and written back
    pub succeeded: usize,
    pub failures: Vec<MediaFailure>,
    /// Images this build cannot decode, left untouched
    pub unsupported: Vec<String>,
}

impl MediaReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Probe media files, keeping the ones with a known codec
///
/// Entries that cannot be read or unwrapped are logged and left alone.
pub fn scan_images(paths: &[PathBuf]) -> Vec<MediaEntry> {
    let mut images = Vec::new();

    for path in paths {
        match MediaEntry::probe(path) {
            Ok(entry) if entry.codec.is_known() => images.push(entry),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable media {:?}: {}", path, e),
        }
    }

    info!("Found {} image(s) among {} media entries", images.len(), paths.len());
    images
}

/// Transform one image file in place
pub fn transform_file(path: &Path, transform: &MediaTransform) -> Result<MediaAsset, MediaError> {
    let mut asset = MediaAsset::load(path)?;
    let image = asset.decode()?;
    let edited = transform.apply(image)?;
    asset.replace_image(&edited)?;
    asset.store()?;
    Ok(asset)
}

/// Run a transform over every image among `paths`
pub fn process_media(paths: &[PathBuf], transform: &MediaTransform) -> MediaReport {
    let (images, unsupported): (Vec<_>, Vec<_>) = scan_images(paths)
        .into_iter()
        .partition(|entry| entry.codec.can_decode());
    let total = images.len();
    let mut report = MediaReport {
        scanned: paths.len(),
        images: total + unsupported.len(),
        ..MediaReport::default()
    };

    for entry in unsupported {
        warn!(
            "{}.{} left untouched: {} decoding is not enabled in this build",
            entry.identifier, entry.codec, entry.codec
        );
        report.unsupported.push(entry.identifier);
    }

    if total > 0 {
        info!("Applying {} to {} image(s)", transform.describe(), total);
    }

    for (i, entry) in images.iter().enumerate() {
        match transform_file(&entry.path, transform) {
            Ok(_) => {
                report.succeeded += 1;
                info!("[{}/{}] {}.{} - OK", i + 1, total, entry.identifier, entry.codec);
            }
            Err(e) => {
                warn!(
                    "[{}/{}] {}.{} - FAILED: {}",
                    i + 1,
                    total,
                    entry.identifier,
                    entry.codec,
                    e
                );
                report.failures.push(MediaFailure {
                    identifier: entry.identifier.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    report
}
