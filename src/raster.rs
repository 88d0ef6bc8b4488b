// src/raster.rs
//
// Decoded pixel buffer handed to the core by the image source.
// Row-major storage, either 1 channel (gray / IR sensor) or 3 channels
// in RGB order: pixel (x, y) starts at data[(y * width + x) * channels].

use crate::error::{CompareError, Result};
use crate::types::Bounds;
use image::{DynamicImage, GrayImage, RgbImage};

#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if channels != 1 && channels != 3 {
            return Err(CompareError::Decode(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected || expected == 0 {
            return Err(CompareError::InvalidRaster {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_gray(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 1,
            data: img.into_raw(),
        }
    }

    pub fn from_rgb(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: img.into_raw(),
        }
    }

    /// Gray-family images stay single channel so color heuristics can tell
    /// a sensor image from a color photo.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self::from_gray(img.to_luma8()),
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_color(&self) -> bool {
        self.channels == 3
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn full_bounds(&self) -> Bounds {
        Bounds::new(0, 0, self.width as i32, self.height as i32)
    }

    /// ITU-R BT.601 luma, rounded.
    pub fn to_gray(&self) -> GrayImage {
        if self.channels == 1 {
            // Length was validated on construction.
            return GrayImage::from_raw(self.width, self.height, self.data.clone())
                .unwrap_or_else(|| GrayImage::new(self.width, self.height));
        }
        let mut gray = Vec::with_capacity(self.pixel_count());
        for px in self.data.chunks_exact(3) {
            let g = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            gray.push(g.round().clamp(0.0, 255.0) as u8);
        }
        GrayImage::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// None for single-channel rasters.
    pub fn to_rgb(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}
