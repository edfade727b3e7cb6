//! Trait definitions for perceptual hashing.

use super::preprocess::{GridShape, PixelGrid};
use serde::{Deserialize, Serialize};

/// Available hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Average Hash (aHash) - Fast, good for exact duplicates
    Average,
    /// Difference Hash (dHash) - Good balance of speed and accuracy
    Difference,
    /// Perceptual Hash (pHash) - Most robust, handles edits well
    Perceptual,
}

impl HashAlgorithmKind {
    /// Every algorithm, in cache-field order
    pub const ALL: [HashAlgorithmKind; 3] = [
        HashAlgorithmKind::Average,
        HashAlgorithmKind::Difference,
        HashAlgorithmKind::Perceptual,
    ];

    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => {
                "Average Hash (aHash) - Fast comparison based on average brightness"
            }
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            HashAlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to edits and transformations"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Average => write!(f, "aHash"),
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Perceptual => write!(f, "pHash"),
        }
    }
}

/// Trait for hash algorithm implementations
///
/// Implementations are pure: the same grid always yields the same hash.
pub trait HashAlgorithm: Send + Sync {
    /// The grid this algorithm consumes
    fn grid_shape(&self) -> GridShape;

    /// Compute the 64-bit hash of a preprocessed grid.
    ///
    /// The grid must have the shape returned by [`HashAlgorithm::grid_shape`].
    fn hash_grid(&self, grid: &PixelGrid) -> u64;

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;
}

/// A computed 64-bit fingerprint together with the algorithm that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHash {
    value: u64,
    algorithm: HashAlgorithmKind,
}

impl ImageHash {
    /// Create a new hash value
    pub fn new(value: u64, algorithm: HashAlgorithmKind) -> Self {
        Self { value, algorithm }
    }

    /// The raw 64-bit value
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Get the algorithm that produced this hash
    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.algorithm
    }

    /// Hamming distance to another hash.
    ///
    /// Lower distance = more similar images.
    pub fn distance(&self, other: &Self) -> u32 {
        hamming_distance(self.value, other.value)
    }

    /// Calculate similarity as a percentage (0-100)
    pub fn similarity(&self, other: &Self) -> f64 {
        (1.0 - (self.distance(other) as f64 / 64.0)) * 100.0
    }

    /// Get the hash as a 16 digit hexadecimal string
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.value)
    }
}

/// Number of bits that differ between two hashes
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Packs bits into a u64, first bit most significant.
pub(crate) fn pack_bits(bits: impl IntoIterator<Item = bool>) -> u64 {
    bits.into_iter()
        .fold(0u64, |hash, bit| (hash << 1) | u64::from(bit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_hash(value: u64) -> ImageHash {
        ImageHash::new(value, HashAlgorithmKind::Difference)
    }

    #[test]
    fn distance_to_self_is_zero() {
        let hash = create_test_hash(0xFF00_AA55_1234_5678);
        assert_eq!(hash.distance(&hash), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let hash_a = create_test_hash(0xFF00);
        let hash_b = create_test_hash(0x00FF);

        assert_eq!(hash_a.distance(&hash_b), hash_b.distance(&hash_a));
    }

    #[test]
    fn distance_counts_differing_bits() {
        assert_eq!(hamming_distance(0b1111_1111, 0), 8);
        assert_eq!(hamming_distance(u64::MAX, 0), 64);
    }

    #[test]
    fn similarity_bounds() {
        let hash_a = create_test_hash(u64::MAX);
        let hash_b = create_test_hash(0);

        assert_eq!(hash_a.similarity(&hash_a), 100.0);
        assert_eq!(hash_a.similarity(&hash_b), 0.0);
    }

    #[test]
    fn to_hex_is_zero_padded() {
        assert_eq!(create_test_hash(0xDEAD_BEEF).to_hex(), "00000000deadbeef");
    }

    #[test]
    fn pack_bits_is_msb_first() {
        let mut bits = [false; 64];
        bits[0] = true;
        assert_eq!(pack_bits(bits), 1 << 63);
        bits[63] = true;
        assert_eq!(pack_bits(bits), (1 << 63) | 1);
    }

    #[test]
    fn algorithm_kind_display() {
        assert_eq!(HashAlgorithmKind::Average.to_string(), "aHash");
        assert_eq!(HashAlgorithmKind::Difference.to_string(), "dHash");
        assert_eq!(HashAlgorithmKind::Perceptual.to_string(), "pHash");
    }
}
