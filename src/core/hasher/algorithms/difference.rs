//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to 9 columns x 8 rows and converting to grayscale
//! 2. Comparing each pixel to the one to its right
//! 3. If the right pixel is at least as bright, set bit to 1, else 0
//!
//! This captures the relative gradient of brightness changes. Equal
//! neighbours set the bit, so a uniform image hashes to `u64::MAX`.

use super::super::preprocess::{GridShape, PixelGrid};
use super::super::traits::{pack_bits, HashAlgorithm, HashAlgorithmKind};

/// Difference Hash (dHash) implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn grid_shape(&self) -> GridShape {
        GridShape::DIFFERENCE
    }

    fn hash_grid(&self, grid: &PixelGrid) -> u64 {
        debug_assert_eq!(grid.shape(), GridShape::DIFFERENCE);

        let bits = (0..grid.height()).flat_map(|y| {
            grid.row(y)
                .windows(2)
                .map(|pair| pair[1] >= pair[0])
                .collect::<Vec<_>>()
        });

        pack_bits(bits)
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }
}
