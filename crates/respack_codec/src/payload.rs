//! Compressed payload value objects and batch decoding.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::kind::CompressionType;

/// Bytes as stored in a container record, with the metadata needed to expand them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedPayload {
    /// The stored (possibly compressed) bytes.
    pub bytes: Vec<u8>,
    /// The algorithm the bytes were stored with.
    pub algorithm: CompressionType,
    /// Size of the payload after decompression.
    pub decompressed_size: usize,
}

impl CompressedPayload {
    /// Compresses `data` into a payload that records its original size.
    pub fn compress(data: &[u8], algorithm: CompressionType) -> Result<Self, CodecError> {
        Ok(Self {
            bytes: crate::compress(data, algorithm)?,
            algorithm,
            decompressed_size: data.len(),
        })
    }

    /// Expands the payload back to its original bytes.
    pub fn decompress(&self) -> Result<Vec<u8>, CodecError> {
        crate::decompress(&self.bytes, self.algorithm, self.decompressed_size)
    }

    /// Returns the stored length of the payload.
    pub fn stored_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Decompresses independent payloads in parallel.
///
/// Results keep the order of `payloads`; one failing payload does not affect
/// the others.
pub fn decompress_all(payloads: &[CompressedPayload]) -> Vec<Result<Vec<u8>, CodecError>> {
    payloads
        .par_iter()
        .map(CompressedPayload::decompress)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrip() {
        let data = b"STBL STBL STBL STBL STBL STBL";
        let payload = CompressedPayload::compress(data, CompressionType::ZLib).unwrap();
        assert_eq!(payload.decompressed_size, data.len());
        assert_eq!(payload.algorithm, CompressionType::ZLib);
        assert_eq!(payload.decompress().unwrap(), data);
    }

    #[test]
    fn stored_size_reflects_compression() {
        let data = vec![0u8; 4096];
        let payload =
            CompressedPayload::compress(&data, CompressionType::InternalCompression).unwrap();
        assert!(payload.stored_size() < 64);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let good_a = CompressedPayload::compress(b"first payload", CompressionType::ZLib).unwrap();
        let bad = CompressedPayload {
            bytes: vec![0x10, 0xFB, 0x00],
            algorithm: CompressionType::InternalCompression,
            decompressed_size: 3,
        };
        let good_b =
            CompressedPayload::compress(b"second payload", CompressionType::InternalCompression)
                .unwrap();

        let results = decompress_all(&[good_a, bad, good_b]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref().unwrap(), b"first payload");
        assert!(matches!(results[1], Err(CodecError::Decode(_))));
        assert_eq!(results[2].as_deref().unwrap(), b"second payload");
    }

    #[test]
    fn serde_roundtrip() {
        let payload = CompressedPayload {
            bytes: vec![1, 2, 3],
            algorithm: CompressionType::DeletedRecord,
            decompressed_size: 3,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("65504"));
        let back: CompressedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
