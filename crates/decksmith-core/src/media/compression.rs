//! Compression wrapper around media payloads
//!
//! Newer exports wrap each media blob in a zstd frame. The frame may or may
//! not declare its content size, so decompression tries a bounded one-shot
//! decode first and falls back to streaming until end-of-frame when that
//! fails. Recompression uses default settings; the output only has to
//! decompress to the same payload, not match the original bytes.

use std::io::{self, Read};

use thiserror::Error;
use tracing::debug;

/// zstd frame magic number (little-endian 0xFD2FB528)
const FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Short magic accepted by the export format alongside the frame magic
const SHORT_MAGIC: [u8; 2] = [0xB5, 0xFD];

/// Output cap for the one-shot decode
pub const MAX_BOUNDED_OUTPUT: usize = 10 * 1024 * 1024;

/// Errors from the compression adapter
#[derive(Error, Debug)]
pub enum CompressionError {
    /// Both the bounded and the streaming decode failed
    #[error("Failed to decompress media payload: {0}")]
    Decompress(#[source] io::Error),

    /// Recompression failed
    #[error("Failed to compress media payload: {0}")]
    Compress(#[source] io::Error),
}

/// Check whether a payload starts with a known compression magic
pub fn is_wrapped(bytes: &[u8]) -> bool {
    bytes.starts_with(&FRAME_MAGIC) || bytes.starts_with(&SHORT_MAGIC)
}

/// Decompress a wrapped payload
///
/// A failed bounded decode is not an error: it is the signal to stream.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    match zstd::bulk::decompress(bytes, MAX_BOUNDED_OUTPUT) {
        Ok(payload) => Ok(payload),
        Err(e) => {
            debug!("Bounded decompression failed ({}), streaming instead", e);
            zstd::stream::decode_all(bytes).map_err(CompressionError::Decompress)
        }
    }
}

/// Decompress only the first `len` bytes of a wrapped payload
///
/// Enough to sniff a codec without inflating the whole image.
pub fn decompress_prefix(bytes: &[u8], len: usize) -> Result<Vec<u8>, CompressionError> {
    let decoder = zstd::stream::read::Decoder::new(bytes).map_err(CompressionError::Decompress)?;
    let mut prefix = Vec::with_capacity(len);
    decoder
        .take(len as u64)
        .read_to_end(&mut prefix)
        .map_err(CompressionError::Decompress)?;
    Ok(prefix)
}

/// Compress a payload with default settings
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    zstd::stream::encode_all(bytes, zstd::DEFAULT_COMPRESSION_LEVEL)
        .map_err(CompressionError::Compress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_wrapped() {
        assert!(is_wrapped(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]));
        assert!(is_wrapped(&[0xB5, 0xFD, 0x01]));
        assert!(!is_wrapped(b"\x89PNG\r\n\x1a\n"));
        assert!(!is_wrapped(&[0x28, 0xB5]));
        assert!(!is_wrapped(&[]));
    }

    #[test]
    fn test_compressed_output_is_wrapped() {
        let compressed = compress(b"hello media").unwrap();
        assert!(is_wrapped(&compressed));
    }

    #[test]
    fn test_roundtrip() {
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let compressed = compress(&payload).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), payload);

        let empty = compress(&[]).unwrap();
        assert!(decompress(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_streamed_frame_without_content_size() {
        let payload = b"streamed payload ".repeat(1000);

        // A streaming encoder with no pledged size leaves the frame header
        // without a content size.
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), 0).unwrap();
        encoder.include_contentsize(false).unwrap();
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        assert!(is_wrapped(&compressed));
        assert_eq!(decompress(&compressed).unwrap(), payload);
    }

    #[test]
    fn test_oversized_payload_falls_back_to_streaming() {
        let payload = vec![7u8; MAX_BOUNDED_OUTPUT + 1024];
        let compressed = compress(&payload).unwrap();

        assert!(zstd::bulk::decompress(&compressed, MAX_BOUNDED_OUTPUT).is_err());
        assert_eq!(decompress(&compressed).unwrap(), payload);
    }

    #[test]
    fn test_decompress_prefix() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
        let compressed = compress(&payload).unwrap();

        assert_eq!(decompress_prefix(&compressed, 32).unwrap(), &payload[..32]);

        let short = compress(b"tiny").unwrap();
        assert_eq!(decompress_prefix(&short, 32).unwrap(), b"tiny");
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = decompress(&[0x28, 0xB5, 0x2F, 0xFD, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CompressionError::Decompress(_)));
    }
}
