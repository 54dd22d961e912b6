//! Transparent gzip compression for large record bodies.
//!
//! Bodies above the configured threshold are compressed before the
//! store write and detected on read via the gzip magic bytes, so mixed
//! compressed/uncompressed data coexists in one store.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::{KegError, Result};

/// Gzip stream magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether stored bytes hold a gzip stream.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Gzip-compress at best compression.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| KegError::Compression(format!("failed to write gzip stream: {e}")))?;
    encoder
        .finish()
        .map_err(|e| KegError::Compression(format!("failed to finish gzip stream: {e}")))
}

/// Decompress a gzip stream, reading at most `limit` bytes.
///
/// The limit guards against decompression bombs; it should be the
/// configured maximum body size.
pub fn decompress(data: &[u8], limit: u64) -> Result<Vec<u8>> {
    let decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| KegError::Compression(format!("failed to decompress: {e}")))?;
    Ok(out)
}
