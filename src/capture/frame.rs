//! Raster data structures for captured and uploaded images

use image::{DynamicImage, RgbaImage};
use std::time::Instant;

/// An RGBA pixel grid owned by whichever stage currently holds it
#[derive(Debug, Clone)]
pub struct Raster {
    /// Raw RGBA pixel data, row-major, 4 bytes per pixel
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// When the raster was acquired
    pub timestamp: Instant,
}

impl Raster {
    /// Create a raster from raw RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 4);
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Create a raster filled with a single RGBA colour
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(data, width, height)
    }

    /// Get raster dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte offset of the pixel at (x, y)
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Red channel at (x, y); after greyscale this is the luminance
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y)]
    }

    /// Write the same value into R, G and B at (x, y), leaving alpha alone
    #[inline]
    pub fn set_luma(&mut self, x: u32, y: u32, value: u8) {
        let idx = self.index(x, y);
        self.data[idx] = value;
        self.data[idx + 1] = value;
        self.data[idx + 2] = value;
    }

    /// Decode an encoded image (PNG, JPEG, WebP, ...) into a raster
    pub fn decode(bytes: &[u8]) -> image::ImageResult<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from(decoded))
    }

    /// Convert into an `image` buffer, consuming the raster
    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }
}

impl From<RgbaImage> for Raster {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }
}

impl From<DynamicImage> for Raster {
    fn from(image: DynamicImage) -> Self {
        Self::from(image.to_rgba8())
    }
}
