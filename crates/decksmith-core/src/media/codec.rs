//! Image codec adapter
//!
//! Sniffs the three supported image formats from their signatures, decodes
//! them to a [`DynamicImage`] and re-encodes in the same codec:
//!
//! | Codec | Signature | Re-encode |
//! |---|---|---|
//! | PNG | 8-byte magic | lossless |
//! | JPEG | `FF D8` start-of-image | quality 85 |
//! | AVIF | `ftyp` box with an avif/avis/mif1 brand in the first 32 bytes | quality 80 |
//!
//! Lossy codecs receive a plain RGB (or grayscale) buffer: alpha is flattened
//! away before encoding instead of letting the encoder reject it.

use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use thiserror::Error;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Leading bytes that decide the codec; also the window scanned for `ftyp`
pub const SNIFF_WINDOW: usize = 32;

/// Brands accepted as AVIF (still image, image sequence, generic HEIF)
const AVIF_BRANDS: [&[u8; 4]; 3] = [b"avif", b"avis", b"mif1"];

pub const JPEG_QUALITY: u8 = 85;
pub const AVIF_QUALITY: u8 = 80;
pub const AVIF_SPEED: u8 = 4;

/// Errors from decoding or encoding an image
#[derive(Error, Debug)]
pub enum CodecError {
    /// The payload did not match any supported signature
    #[error("Unsupported image format")]
    Unknown,

    /// Decoding failed
    #[error("Failed to decode {codec} image: {source}")]
    Decode {
        codec: Codec,
        #[source]
        source: image::ImageError,
    },

    /// Encoding failed
    #[error("Failed to encode {codec} image: {source}")]
    Encode {
        codec: Codec,
        #[source]
        source: image::ImageError,
    },

    /// Encoder not compiled in
    #[error("{0} encoding is not enabled in this build")]
    EncoderUnavailable(Codec),

    /// Decoder not compiled in
    #[error("{0} decoding is not enabled in this build")]
    DecoderUnavailable(Codec),
}

/// Image codec detected from signature bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Png,
    Jpeg,
    Avif,
    Unknown,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Png => "png",
            Codec::Jpeg => "jpeg",
            Codec::Avif => "avif",
            Codec::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Codec::Unknown)
    }

    /// Whether this build can decode the codec
    ///
    /// AVIF decoding needs the `avif-native` feature (system dav1d).
    pub fn can_decode(&self) -> bool {
        match self {
            Codec::Png | Codec::Jpeg => true,
            Codec::Avif => cfg!(feature = "avif-native"),
            Codec::Unknown => false,
        }
    }

    fn image_format(&self) -> Option<ImageFormat> {
        match self {
            Codec::Png => Some(ImageFormat::Png),
            Codec::Jpeg => Some(ImageFormat::Jpeg),
            Codec::Avif => Some(ImageFormat::Avif),
            Codec::Unknown => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the codec of an (already unwrapped) payload
pub fn sniff(bytes: &[u8]) -> Codec {
    if bytes.starts_with(&PNG_MAGIC) {
        Codec::Png
    } else if has_avif_ftyp(bytes) {
        Codec::Avif
    } else if bytes.starts_with(&JPEG_SOI) {
        Codec::Jpeg
    } else {
        Codec::Unknown
    }
}

/// Scan the leading `ftyp` box for an accepted brand
///
/// Box layout: size(4) `ftyp`(4) major_brand(4) minor_version(4)
/// compatible_brands(4 * n). Only brands inside the first 32 bytes count.
fn has_avif_ftyp(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let Some(pos) = window.windows(4).position(|w| w == b"ftyp") else {
        return false;
    };

    let brands_start = pos + 4;
    window
        .get(brands_start..)
        .unwrap_or_default()
        .chunks_exact(4)
        .enumerate()
        // index 1 is the minor version, not a brand
        .filter(|(i, _)| *i != 1)
        .any(|(_, brand)| AVIF_BRANDS.iter().any(|b| brand == &b[..]))
}

/// Decode a payload of a known codec
pub fn decode(bytes: &[u8], codec: Codec) -> Result<DynamicImage, CodecError> {
    let format = codec.image_format().ok_or(CodecError::Unknown)?;
    if !codec.can_decode() {
        return Err(CodecError::DecoderUnavailable(codec));
    }
    image::load_from_memory_with_format(bytes, format)
        .map_err(|source| CodecError::Decode { codec, source })
}

/// Encode an image in the given codec with the fixed quality defaults
pub fn encode(image: &DynamicImage, codec: Codec) -> Result<Vec<u8>, CodecError> {
    let mut out = Cursor::new(Vec::new());

    let result = match codec {
        Codec::Png => image.write_with_encoder(PngEncoder::new(&mut out)),
        Codec::Jpeg => flatten_alpha(image)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)),
        Codec::Avif => return encode_avif(image),
        Codec::Unknown => return Err(CodecError::Unknown),
    };

    result.map_err(|source| CodecError::Encode { codec, source })?;
    Ok(out.into_inner())
}

#[cfg(feature = "avif")]
fn encode_avif(image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    use image::codecs::avif::AvifEncoder;

    let mut out = Vec::new();
    flatten_alpha(image)
        .write_with_encoder(AvifEncoder::new_with_speed_quality(
            &mut out,
            AVIF_SPEED,
            AVIF_QUALITY,
        ))
        .map_err(|source| CodecError::Encode {
            codec: Codec::Avif,
            source,
        })?;
    Ok(out)
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    Err(CodecError::EncoderUnavailable(Codec::Avif))
}

/// Reduce any buffer to 8-bit RGB or grayscale without alpha
///
/// Borrowed when the buffer is already in one of those layouts.
fn flatten_alpha(image: &DynamicImage) -> std::borrow::Cow<'_, DynamicImage> {
    use std::borrow::Cow;

    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(image),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}
