//! # Hasher Module
//!
//! Computes 64-bit perceptual hashes for images.
//!
//! ## Supported Algorithms
//! - **aHash (Average Hash)** - 8x8 grid thresholded against its mean
//! - **dHash (Difference Hash)** - signs of horizontal gradients on a 9x8 grid
//! - **pHash (Perceptual Hash)** - low-frequency DCT coefficients of a 32x32 grid
//!
//! ## How It Works
//! 1. Read the file (memory-mapped when large) and decode it
//! 2. Convert to grayscale and resize to the algorithm's grid
//! 3. Compute the hash from pixel relationships
//! 4. Compare hashes using Hamming distance
//!
//! ## Example
//! ```rust,ignore
//! use pihash::core::hasher::{HashAlgorithmKind, HasherSet};
//!
//! let hashers = HasherSet::new();
//! let image = image::open("photo.jpg")?;
//! let hash = hashers.hash_image(&image, HashAlgorithmKind::Difference)?;
//! println!("{}", hash.to_hex());
//! ```

mod algorithms;
pub mod fast_decode;
pub mod mmap_decode;
pub mod preprocess;
mod traits;

pub use algorithms::{AverageHasher, DifferenceHasher, PerceptualHasher};
pub use fast_decode::FastDecoder;
pub use preprocess::{GridShape, PixelGrid, Preprocessor};
pub use traits::{hamming_distance, HashAlgorithm, HashAlgorithmKind, ImageHash};

use crate::error::HashError;
use image::DynamicImage;
use std::path::Path;

/// The three hash engines, ready to use.
///
/// Building a set plans the DCT once; reuse it across images.
pub struct HasherSet {
    average: AverageHasher,
    difference: DifferenceHasher,
    perceptual: PerceptualHasher,
}

impl HasherSet {
    /// Create all hashers
    pub fn new() -> Self {
        Self {
            average: AverageHasher::new(),
            difference: DifferenceHasher::new(),
            perceptual: PerceptualHasher::new(),
        }
    }

    /// The engine for `kind`
    pub fn get(&self, kind: HashAlgorithmKind) -> &dyn HashAlgorithm {
        match kind {
            HashAlgorithmKind::Average => &self.average,
            HashAlgorithmKind::Difference => &self.difference,
            HashAlgorithmKind::Perceptual => &self.perceptual,
        }
    }

    /// Compute one hash from an already-loaded image
    pub fn hash_image(
        &self,
        image: &DynamicImage,
        kind: HashAlgorithmKind,
    ) -> Result<ImageHash, HashError> {
        let mut hashes = self.hash_image_many(image, &[kind], Path::new(""))?;
        hashes
            .pop()
            .ok_or_else(|| HashError::ComputationFailed("no hash produced".to_string()))
    }

    /// Compute several hashes from one decoded image.
    ///
    /// The luminance conversion is shared; each algorithm gets its own grid.
    /// `source` is only used for error messages.
    pub fn hash_image_many(
        &self,
        image: &DynamicImage,
        kinds: &[HashAlgorithmKind],
        source: &Path,
    ) -> Result<Vec<ImageHash>, HashError> {
        let mut preprocessor = Preprocessor::new(image, source)?;

        kinds
            .iter()
            .map(|&kind| {
                let algorithm = self.get(kind);
                let grid = preprocessor.grid(algorithm.grid_shape())?;
                Ok(ImageHash::new(algorithm.hash_grid(&grid), kind))
            })
            .collect()
    }

    /// Read, decode and hash a file without any caching
    pub fn hash_file(&self, path: &Path, kind: HashAlgorithmKind) -> Result<ImageHash, HashError> {
        let bytes = mmap_decode::read_file_bytes(path)?;
        let image = FastDecoder::decode_bytes(path, &bytes)?;
        let mut hashes = self.hash_image_many(&image, &[kind], path)?;
        hashes
            .pop()
            .ok_or_else(|| HashError::ComputationFailed("no hash produced".to_string()))
    }
}

impl Default for HasherSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_solid_image(r: u8, g: u8, b: u8) -> DynamicImage {
        let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([r, g, b]));
        DynamicImage::ImageRgb8(img)
    }

    fn create_noise_image(seed: u64) -> DynamicImage {
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
        let img = ImageBuffer::from_fn(64, 64, |_, _| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let v = (state >> 56) as u8;
            Rgb([v, v.wrapping_mul(3), v.wrapping_add(91)])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn get_dispatches_by_kind() {
        let hashers = HasherSet::new();
        for kind in HashAlgorithmKind::ALL {
            assert_eq!(hashers.get(kind).kind(), kind);
        }
    }

    #[test]
    fn uniform_gray_ties_resolve_to_all_ones() {
        let hashers = HasherSet::new();
        let image = create_solid_image(128, 128, 128);

        let ahash = hashers.hash_image(&image, HashAlgorithmKind::Average).unwrap();
        let dhash = hashers.hash_image(&image, HashAlgorithmKind::Difference).unwrap();

        assert_eq!(ahash.value(), u64::MAX);
        assert_eq!(dhash.value(), u64::MAX);
    }

    #[test]
    fn many_matches_individual_hashes() {
        let hashers = HasherSet::new();
        let image = create_noise_image(7);

        let all = hashers
            .hash_image_many(&image, &HashAlgorithmKind::ALL, Path::new("noise.png"))
            .unwrap();

        for (hash, kind) in all.iter().zip(HashAlgorithmKind::ALL) {
            assert_eq!(hash.algorithm(), kind);
            assert_eq!(*hash, hashers.hash_image(&image, kind).unwrap());
        }
    }

    #[test]
    fn random_images_rarely_collide() {
        let hashers = HasherSet::new();

        for kind in HashAlgorithmKind::ALL {
            let mut collisions = 0;
            for seed in 0..40u64 {
                let a = hashers.hash_image(&create_noise_image(seed * 2 + 1), kind).unwrap();
                let b = hashers.hash_image(&create_noise_image(seed * 2 + 2), kind).unwrap();
                if a == b {
                    collisions += 1;
                }
            }
            assert!(collisions <= 2, "{} collided {} times", kind, collisions);
        }
    }
}
