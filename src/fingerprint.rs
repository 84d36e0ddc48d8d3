use anyhow::{Context, Result};
use image_hasher::{HashAlg, Hasher, HasherConfig};

/// Distance reported for fingerprints that are not the same bit-length.
/// Larger than any usable threshold, so such pairs never end up grouped
/// without callers having to special-case them.
pub const MISMATCHED_LENGTH_DISTANCE: u32 = 999;

/// Computes fixed-length perceptual fingerprints from raw image bytes.
///
/// The hash is DCT-based, so re-encodes, mild rescales and compression
/// artifacts of the same picture land within a small Hamming distance of
/// each other. It is not a content checksum.
pub struct FingerprintExtractor {
    hasher: Hasher,
}

impl FingerprintExtractor {
    /// `hash_size` is the side length of the hash grid: 16 yields a
    /// 256-bit fingerprint, rendered as 64 hex digits.
    pub fn new(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .hash_size(hash_size, hash_size)
            .to_hasher();
        Self { hasher }
    }

    /// Decode `bytes` as an image and hash it. Any decode failure is an
    /// ordinary error for the caller to record, never a panic.
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Result<String> {
        let img = image::load_from_memory(bytes).context("failed to decode image")?;
        let hash = self.hasher.hash_image(&img);
        Ok(hash.as_bytes().iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Exact bitwise Hamming distance between two hex-encoded fingerprints.
///
/// Hex digits are decoded to their 4-bit values before comparison: two
/// strings differing in one digit can differ in anywhere from 1 to 4 bits.
/// Mismatched lengths (and undecodable digits) yield
/// [`MISMATCHED_LENGTH_DISTANCE`] instead of an error.
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    if a.len() != b.len() {
        return MISMATCHED_LENGTH_DISTANCE;
    }
    let mut distance = 0;
    for (da, db) in a.chars().zip(b.chars()) {
        match (da.to_digit(16), db.to_digit(16)) {
            (Some(na), Some(nb)) => distance += (na ^ nb).count_ones(),
            // Not comparable as bit-vectors; same policy as a length mismatch.
            _ => return MISMATCHED_LENGTH_DISTANCE,
        }
    }
    distance
}
