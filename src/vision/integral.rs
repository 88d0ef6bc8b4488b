// src/vision/integral.rs
//
// Summed-area table for O(1) box means (adaptive threshold, sliding plate
// windows, masked reflectivity cells).

use crate::types::Bounds;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::integral_image;

pub struct IntegralImage {
    /// (w+1)×(h+1); entry (x, y) holds the sum over [0, x) × [0, y).
    table: ImageBuffer<Luma<u64>, Vec<u64>>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        Self {
            table: integral_image::<_, u64>(gray),
            width: gray.width(),
            height: gray.height(),
        }
    }

    /// Sum over the region clipped to the image.
    pub fn sum(&self, bounds: &Bounds) -> u64 {
        let b = bounds.clip_to(self.width, self.height);
        if b.is_empty() {
            return 0;
        }
        let (x0, y0) = (b.x as u32, b.y as u32);
        let (x1, y1) = (b.right() as u32, b.bottom() as u32);
        let at = |x: u32, y: u32| self.table.get_pixel(x, y).0[0];
        (at(x1, y1) + at(x0, y0)).saturating_sub(at(x1, y0) + at(x0, y1))
    }

    /// Number of pixels of the region inside the image.
    pub fn count(&self, bounds: &Bounds) -> i64 {
        bounds.clip_to(self.width, self.height).area()
    }

    /// Mean over the clipped region, 0.0 when it lies outside the image.
    pub fn mean(&self, bounds: &Bounds) -> f64 {
        let n = self.count(bounds);
        if n == 0 {
            return 0.0;
        }
        self.sum(bounds) as f64 / n as f64
    }
}
