//! Compression support for input and output payloads.
//!
//! NIfTI volumes are commonly gzip-wrapped (`.nii.gz`), and GIFTI arrays
//! with `GZipBase64Binary` encoding carry a zlib stream.

use std::io::{Read, Write};
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::util::Result;

/// gzip member header magic.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check if data starts with the gzip magic.
#[inline]
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Check if data looks like a zlib stream.
///
/// zlib header: 0x78 followed by 0x01, 0x5E, 0x9C, or 0xDA
pub fn is_zlib(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x78 && matches!(data[1], 0x01 | 0x5E | 0x9C | 0xDA)
}

/// Decompress a (possibly multi-member) gzip stream.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Compress data as gzip.
///
/// `level` follows zlib conventions (0-9); out-of-range values use the
/// default level.
pub fn gzip(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let level = if level <= 9 { Compression::new(level) } else { Compression::default() };
    let mut encoder = GzEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Compress data as a raw zlib stream.
pub fn zlib_compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let level = if level <= 9 { Compression::new(level) } else { Compression::default() };
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a raw zlib stream.
///
/// `size_hint` preallocates the output buffer when the caller knows the
/// decoded length.
pub fn zlib_decompress(data: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(size_hint);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_roundtrip() {
        let original = b"Dense series payload that should compress well. ".repeat(100);

        let compressed = gzip(&original, 6).unwrap();
        assert!(is_gzip(&compressed));
        assert!(compressed.len() < original.len());

        assert_eq!(gunzip(&compressed).unwrap(), original);
    }

    #[test]
    fn test_zlib_roundtrip() {
        let original = b"0.5 0.25 0.125 ".repeat(64);
        let compressed = zlib_compress(&original, 9).unwrap();

        assert!(is_zlib(&compressed));
        assert!(!is_gzip(&compressed));
        assert_eq!(zlib_decompress(&compressed, original.len()).unwrap(), original);
    }

    #[test]
    fn test_plain_data_is_not_compressed() {
        let original = b"n+2\0\r\n";
        assert!(!is_gzip(original));
        assert!(!is_zlib(original));
    }

    #[test]
    fn test_gunzip_rejects_garbage() {
        let garbage = [0x1f, 0x8b, 0x00, 0x01, 0x02];
        assert!(gunzip(&garbage).is_err());
    }
}
