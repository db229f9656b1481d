// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compression (§4.6): compressed payloads are raw zstd, bounded to a 1 MiB
//! decoded output. A decoder failure is never fatal — it drops the message.

use bytes::Bytes;
use thiserror::Error;

/// Bound on decoded output size; a payload that would exceed this is
/// treated as a decoder failure rather than silently truncated.
pub const MAX_DECOMPRESSED_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("zstd decode failed: {0}")]
    Decode(#[from] std::io::Error),
    #[error("decompressed output exceeds {MAX_DECOMPRESSED_BYTES} bytes")]
    OutputTooLarge,
}

/// Decompresses a raw zstd frame, bounded to [`MAX_DECOMPRESSED_BYTES`].
pub fn decompress(input: &[u8]) -> Result<Bytes, CompressionError> {
    let decoded = zstd::stream::decode_all(input)?;
    if decoded.len() > MAX_DECOMPRESSED_BYTES {
        return Err(CompressionError::OutputTooLarge);
    }
    Ok(Bytes::from(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_payload() {
        let original = b"module inventory payload".repeat(10);
        let compressed = zstd::stream::encode_all(&original[..], 3).expect("encode");
        let decoded = decompress(&compressed).expect("decode");
        assert_eq!(&decoded[..], &original[..]);
    }

    #[test]
    fn invalid_input_never_panics() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03];
        assert!(decompress(&garbage).is_err());
    }
}
