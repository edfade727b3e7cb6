//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to 8x8 and converting to grayscale
//! 2. Computing the average brightness
//! 3. For each pixel: if at least as bright as the average, set bit to 1, else 0
//!
//! Bits are emitted row-major, first pixel in the most significant bit.
//! A pixel equal to the mean sets its bit, so a uniform image hashes to
//! `u64::MAX` and no image ever hashes to 0.

use super::super::preprocess::{GridShape, PixelGrid};
use super::super::traits::{pack_bits, HashAlgorithm, HashAlgorithmKind};

/// Average Hash (aHash) implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct AverageHasher;

impl AverageHasher {
    /// Create a new aHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for AverageHasher {
    fn grid_shape(&self) -> GridShape {
        GridShape::AVERAGE
    }

    fn hash_grid(&self, grid: &PixelGrid) -> u64 {
        debug_assert_eq!(grid.shape(), GridShape::AVERAGE);

        let samples = grid.samples();
        let total: u64 = samples.iter().map(|&s| s as u64).sum();
        let count = samples.len() as u64;

        // sample >= total / count, compared without rounding
        pack_bits(samples.iter().map(|&s| s as u64 * count >= total))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Average
    }
}
