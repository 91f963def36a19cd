//! Media assets read from a staging directory

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use super::codec::{self, Codec};
use super::compression;
use super::MediaError;

/// What a scan learns about one media entry without keeping its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaEntry {
    /// Archive-relative name
    pub identifier: String,
    #[serde(skip)]
    pub path: PathBuf,
    /// Size on disk, wrapper included
    pub size: u64,
    pub compressed: bool,
    pub codec: Codec,
}

impl MediaEntry {
    /// Read an entry and classify it
    ///
    /// Wrapped entries are only inflated far enough to sniff the codec.
    pub fn probe(path: &Path) -> Result<Self, MediaError> {
        let raw = read_file(path)?;
        let compressed = compression::is_wrapped(&raw);
        let codec = if compressed {
            codec::sniff(&compression::decompress_prefix(&raw, codec::SNIFF_WINDOW)?)
        } else {
            codec::sniff(&raw)
        };

        Ok(Self {
            identifier: identifier_for(path),
            path: path.to_path_buf(),
            size: raw.len() as u64,
            compressed,
            codec,
        })
    }
}

/// A media blob loaded for transformation
///
/// `payload` always holds the unwrapped image bytes; `compressed` remembers
/// whether the blob has to be wrapped again on the way out.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub identifier: String,
    pub path: PathBuf,
    pub payload: Vec<u8>,
    pub compressed: bool,
    pub codec: Codec,
}

impl MediaAsset {
    /// Read, unwrap and sniff a media file
    pub fn load(path: &Path) -> Result<Self, MediaError> {
        let raw = read_file(path)?;
        let compressed = compression::is_wrapped(&raw);
        let payload = if compressed {
            compression::decompress(&raw)?
        } else {
            raw
        };

        Ok(Self {
            identifier: identifier_for(path),
            path: path.to_path_buf(),
            codec: codec::sniff(&payload),
            payload,
            compressed,
        })
    }

    /// Decode the payload into a pixel buffer
    pub fn decode(&self) -> Result<DynamicImage, MediaError> {
        Ok(codec::decode(&self.payload, self.codec)?)
    }

    /// Replace the payload with a re-encoded image in the asset's own codec
    pub fn replace_image(&mut self, image: &DynamicImage) -> Result<(), MediaError> {
        self.payload = codec::encode(image, self.codec)?;
        Ok(())
    }

    /// Write the payload back to its file, re-wrapping when it came wrapped
    pub fn store(&self) -> Result<(), MediaError> {
        let bytes = if self.compressed {
            compression::compress(&self.payload)?
        } else {
            self.payload.clone()
        };

        fs::write(&self.path, bytes).map_err(|source| MediaError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, MediaError> {
    fs::read(path).map_err(|source| MediaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn identifier_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
