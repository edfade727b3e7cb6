//! Perceptual Hash (pHash) implementation.
//!
//! pHash uses the Discrete Cosine Transform (DCT) to extract
//! frequency information from the image. This makes it more
//! robust to:
//! - Scaling
//! - Minor rotations
//! - Brightness/contrast changes
//! - Compression artifacts
//!
//! ## Bit layout
//! The 8x8 lowest-frequency block of the 32x32 DCT is scanned row-major,
//! most significant bit first. The DC coefficient at (0, 0) only reflects
//! overall brightness: it is left out of the median and its bit (bit 63)
//! is always 0. Every other bit is 1 when its coefficient is `>=` the
//! median of the 63 AC coefficients, so at least 32 bits are always set.

use super::super::preprocess::{GridShape, PixelGrid};
use super::super::traits::{pack_bits, HashAlgorithm, HashAlgorithmKind};
use rustdct::{DctPlanner, TransformType2And3};
use std::sync::Arc;

/// Side of the low-frequency block kept from the DCT
const BLOCK: usize = 8;

/// Perceptual Hash (pHash) implementation using DCT
pub struct PerceptualHasher {
    dct: Arc<dyn TransformType2And3<f64>>,
}

impl PerceptualHasher {
    /// Create a new pHash hasher
    pub fn new() -> Self {
        let mut planner = DctPlanner::new();
        Self {
            dct: planner.plan_dct2(GridShape::PERCEPTUAL.width as usize),
        }
    }

    /// 2-D DCT-II of a square grid, computed separably.
    ///
    /// Returns coefficients row-major, row = vertical frequency.
    fn dct_2d(&self, grid: &PixelGrid) -> Vec<f64> {
        let n = grid.width() as usize;
        let mut data: Vec<f64> = grid.samples().iter().map(|&s| s as f64).collect();
        let mut scratch = vec![0.0; self.dct.get_scratch_len()];

        for pass in 0..2 {
            for row in data.chunks_exact_mut(n) {
                self.dct.process_dct2_with_scratch(row, &mut scratch);
            }
            if pass == 0 {
                transpose_square(&mut data, n);
            }
        }
        transpose_square(&mut data, n);
        data
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn grid_shape(&self) -> GridShape {
        GridShape::PERCEPTUAL
    }

    fn hash_grid(&self, grid: &PixelGrid) -> u64 {
        debug_assert_eq!(grid.shape(), GridShape::PERCEPTUAL);

        let n = grid.width() as usize;
        let coefficients = self.dct_2d(grid);

        let block: Vec<f64> = (0..BLOCK)
            .flat_map(|v| coefficients[v * n..v * n + BLOCK].iter().copied())
            .collect();

        let mut ac: Vec<f64> = block[1..].to_vec();
        ac.sort_by(f64::total_cmp);
        let median = ac[ac.len() / 2];

        let bits = block
            .iter()
            .enumerate()
            .map(|(i, &c)| i != 0 && c >= median);

        pack_bits(bits)
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }
}

fn transpose_square(data: &mut [f64], n: usize) {
    for row in 0..n {
        for col in row + 1..n {
            data.swap(row * n + col, col * n + row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_fn(f: impl Fn(u32, u32) -> u8) -> PixelGrid {
        let samples = (0..32)
            .flat_map(|y| (0..32).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        PixelGrid::from_samples(32, 32, samples).unwrap()
    }

    #[test]
    fn identical_grids_produce_identical_hash() {
        let hasher = PerceptualHasher::new();
        let grid = grid_from_fn(|x, y| ((x * 7 + y * 3) % 256) as u8);

        assert_eq!(hasher.hash_grid(&grid), hasher.hash_grid(&grid));
        assert_eq!(hasher.hash_grid(&grid), PerceptualHasher::new().hash_grid(&grid));
    }

    #[test]
    fn dc_bit_is_clear_and_half_the_bits_are_set() {
        let hasher = PerceptualHasher::new();
        let grid = grid_from_fn(|x, y| ((x * x + y * 5) % 256) as u8);

        let hash = hasher.hash_grid(&grid);

        assert_eq!(hash >> 63, 0);
        assert!(hash.count_ones() >= 32);
    }

    #[test]
    fn dct_of_constant_has_only_dc_energy() {
        let hasher = PerceptualHasher::new();
        let coefficients = hasher.dct_2d(&grid_from_fn(|_, _| 100));

        assert!(coefficients[0] > 1000.0);
        assert!(coefficients[1..].iter().all(|c| c.abs() < 1e-6));
    }

    #[test]
    fn dct_separates_horizontal_and_vertical_structure() {
        let hasher = PerceptualHasher::new();
        // Left half bright: energy in the first row (horizontal frequencies)
        let coefficients = hasher.dct_2d(&grid_from_fn(|x, _| if x < 16 { 255 } else { 0 }));

        assert!(coefficients[1].abs() > 1000.0);
        assert!(coefficients[32].abs() < 1e-6);
    }

    #[test]
    fn brightness_shift_does_not_change_hash() {
        let hasher = PerceptualHasher::new();
        let base = grid_from_fn(|x, y| ((x * 6 + y * 2) % 200) as u8);
        let brighter = grid_from_fn(|x, y| ((x * 6 + y * 2) % 200) as u8 + 40);

        let distance = (hasher.hash_grid(&base) ^ hasher.hash_grid(&brighter)).count_ones();
        assert!(distance <= 4, "distance {}", distance);
    }

    #[test]
    fn dct_matches_direct_summation() {
        use std::f64::consts::PI;

        let hasher = PerceptualHasher::new();
        let pattern = |x: u32, y: u32| ((x * 13 + y * y * 3) % 251) as u8;
        let coefficients = hasher.dct_2d(&grid_from_fn(pattern));

        // Every row shares one scratch buffer; check rows from both passes
        for &(u, v) in &[(0, 0), (1, 0), (0, 1), (3, 5), (7, 7), (31, 31)] {
            let mut expected = 0.0;
            for y in 0..32u32 {
                for x in 0..32u32 {
                    expected += pattern(x, y) as f64
                        * (PI / 32.0 * (x as f64 + 0.5) * u as f64).cos()
                        * (PI / 32.0 * (y as f64 + 0.5) * v as f64).cos();
                }
            }
            let actual = coefficients[v * 32 + u];
            assert!((actual - expected).abs() < 1e-3, "({}, {}): {} vs {}", u, v, actual, expected);
        }
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0];
        transpose_square(&mut data, 2);
        assert_eq!(data, vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn kind_returns_perceptual() {
        let hasher = PerceptualHasher::new();
        assert_eq!(hasher.kind(), HashAlgorithmKind::Perceptual);
        assert_eq!(hasher.grid_shape(), GridShape::PERCEPTUAL);
    }
}
