//! Pixel preprocessing: luminance conversion and fixed-size resizing.
//!
//! Uses fast_image_resize with a fixed bilinear convolution on `u8`
//! samples. The convolution is fixed-point, so identical source pixels
//! always produce identical grids.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;

/// Width and height of a hash input grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub width: u32,
    pub height: u32,
}

impl GridShape {
    /// 8x8 grid for aHash
    pub const AVERAGE: GridShape = GridShape { width: 8, height: 8 };
    /// 9 columns x 8 rows for dHash
    pub const DIFFERENCE: GridShape = GridShape { width: 9, height: 8 };
    /// 32x32 grid for pHash
    pub const PERCEPTUAL: GridShape = GridShape { width: 32, height: 32 };

    /// Number of samples in the grid
    pub fn len(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row-major luminance samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelGrid {
    /// Wrap raw samples. Returns `None` when the length does not match.
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Option<Self> {
        if samples.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            width: self.width,
            height: self.height,
        }
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.samples[(y * self.width + x) as usize]
    }

    /// All samples in raster order
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// One row of samples
    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.width) as usize;
        &self.samples[start..start + self.width as usize]
    }
}

/// Converts decoded images into hash input grids.
///
/// The luminance image is computed once and reused for every shape.
pub struct Preprocessor {
    resizer: Resizer,
    source: PathBuf,
    luma: GrayImage,
}

impl Preprocessor {
    /// Prepare an image for grid extraction.
    ///
    /// `source` is only used for error messages.
    pub fn new(image: &DynamicImage, source: impl Into<PathBuf>) -> Result<Self, HashError> {
        let source = source.into();
        // Convert to grayscale first (this is faster than resizing RGB then converting)
        let luma = image.to_luma8();

        if luma.width() == 0 || luma.height() == 0 {
            return Err(HashError::EmptyImage { path: source });
        }

        Ok(Self {
            resizer: Resizer::new(),
            source,
            luma,
        })
    }

    /// Resize the luminance image to `shape`
    pub fn grid(&mut self, shape: GridShape) -> Result<PixelGrid, HashError> {
        if shape.width == 0 || shape.height == 0 {
            return Err(HashError::ComputationFailed(format!(
                "invalid grid shape {}x{}",
                shape.width, shape.height
            )));
        }

        let src_image = Image::from_slice_u8(
            self.luma.width(),
            self.luma.height(),
            // from_slice_u8 wants a mutable slice; the source is never written
            &mut *self.luma,
            PixelType::U8,
        )
        .map_err(|e| HashError::DecodeError {
            path: self.source.clone(),
            reason: format!("Failed to create source image: {}", e),
        })?;

        let mut dst_image = Image::new(shape.width, shape.height, PixelType::U8);

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| HashError::ComputationFailed(format!("Resize failed: {}", e)))?;

        PixelGrid::from_samples(shape.width, shape.height, dst_image.into_vec()).ok_or_else(|| {
            HashError::ComputationFailed("resized buffer has the wrong length".to_string())
        })
    }
}

/// Convenience function for one-off grid extraction
pub fn grid_from_image(image: &DynamicImage, shape: GridShape) -> Result<PixelGrid, HashError> {
    Preprocessor::new(image, PathBuf::new())?.grid(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn grid_has_requested_shape() {
        let image = create_test_image(100, 100);

        for shape in [GridShape::AVERAGE, GridShape::DIFFERENCE, GridShape::PERCEPTUAL] {
            let grid = grid_from_image(&image, shape).unwrap();
            assert_eq!(grid.shape(), shape);
            assert_eq!(grid.samples().len(), shape.len());
        }
    }

    #[test]
    fn upscales_tiny_images() {
        let image = create_test_image(2, 3);
        let grid = grid_from_image(&image, GridShape::PERCEPTUAL).unwrap();
        assert_eq!(grid.width(), 32);
        assert_eq!(grid.height(), 32);
    }

    #[test]
    fn preprocessing_is_deterministic() {
        let image = create_test_image(123, 77);
        let mut first = Preprocessor::new(&image, "a.png").unwrap();
        let mut second = Preprocessor::new(&image, "a.png").unwrap();

        assert_eq!(
            first.grid(GridShape::DIFFERENCE).unwrap(),
            second.grid(GridShape::DIFFERENCE).unwrap()
        );
        // Reusing the resizer gives the same answer
        assert_eq!(
            first.grid(GridShape::AVERAGE).unwrap(),
            first.grid(GridShape::AVERAGE).unwrap()
        );
    }

    #[test]
    fn uniform_image_gives_uniform_grid() {
        let img = ImageBuffer::from_fn(40, 40, |_, _| Rgb([128u8, 128, 128]));
        let grid = grid_from_image(&DynamicImage::ImageRgb8(img), GridShape::AVERAGE).unwrap();
        let first = grid.samples()[0];
        assert!(grid.samples().iter().all(|&s| s == first));
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = DynamicImage::new_rgb8(0, 0);
        let result = Preprocessor::new(&image, "empty.png");
        assert!(matches!(result, Err(HashError::EmptyImage { .. })));
    }

    #[test]
    fn from_samples_checks_length() {
        assert!(PixelGrid::from_samples(2, 2, vec![0; 3]).is_none());
        let grid = PixelGrid::from_samples(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(1, 1), 4);
        assert_eq!(grid.row(1), &[3, 4]);
    }
}
