// src/vision/stats.rs
//
// Scalar statistics over grayscale images. All functions return finite
// values for empty input (0.0) so callers never divide by a zero count.

use crate::types::Bounds;
use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, laplacian_filter};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::stats;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const CANNY_LOW: f32 = 50.0;
pub const CANNY_HIGH: f32 = 150.0;

// ============================================================================
// MOMENTS
// ============================================================================

pub fn mean(gray: &GrayImage) -> f64 {
    mean_std_of(gray.as_raw().iter().map(|&v| v as f64)).0
}

pub fn mean_std(gray: &GrayImage) -> (f64, f64) {
    mean_std_of(gray.as_raw().iter().map(|&v| v as f64))
}

/// Population mean and standard deviation.
pub fn mean_std_of<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0, 0.0);
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, var.sqrt())
}

/// Mean over a sub-rectangle, 0.0 when it lies outside the image.
pub fn region_mean(gray: &GrayImage, bounds: &Bounds) -> f64 {
    let b = bounds.clip_to(gray.width(), gray.height());
    if b.is_empty() {
        return 0.0;
    }
    let mut sum = 0u64;
    for y in b.y..b.bottom() {
        for x in b.x..b.right() {
            sum += gray.get_pixel(x as u32, y as u32).0[0] as u64;
        }
    }
    sum as f64 / b.area() as f64
}

// ============================================================================
// HISTOGRAM
// ============================================================================

pub fn histogram(gray: &GrayImage) -> [u32; 256] {
    stats::histogram(gray)
        .channels
        .first()
        .copied()
        .unwrap_or([0; 256])
}

/// Shannon entropy in bits (0..=8).
pub fn entropy(gray: &GrayImage) -> f64 {
    let total = gray.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    histogram(gray)
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

// ============================================================================
// DERIVATIVES
// ============================================================================

/// Variance and standard deviation of the 3×3 Laplacian response.
pub fn laplacian_stats(gray: &GrayImage) -> (f64, f64) {
    if gray.width() == 0 || gray.height() == 0 {
        return (0.0, 0.0);
    }
    let lap = laplacian_filter(gray);
    let (_, std) = mean_std_of(lap.as_raw().iter().map(|&v| v as f64));
    (std * std, std)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradientStats {
    pub mean_magnitude: f64,
    pub mean_gx: f64,
    pub mean_gy: f64,
}

impl GradientStats {
    /// |gx| / (|gx| + |gy|), 0 when both vanish.
    pub fn directionality(&self) -> f64 {
        let (ax, ay) = (self.mean_gx.abs(), self.mean_gy.abs());
        if ax + ay <= 0.0 {
            return 0.0;
        }
        ax / (ax + ay)
    }
}

pub fn sobel_stats(gray: &GrayImage) -> GradientStats {
    let n = gray.as_raw().len();
    if n == 0 {
        return GradientStats::default();
    }
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let (mut mag, mut sx, mut sy) = (0.0, 0.0, 0.0);
    for (&x, &y) in gx.as_raw().iter().zip(gy.as_raw()) {
        let (x, y) = (x as f64, y as f64);
        mag += x.hypot(y);
        sx += x;
        sy += y;
    }
    GradientStats {
        mean_magnitude: mag / n as f64,
        mean_gx: sx / n as f64,
        mean_gy: sy / n as f64,
    }
}

/// Mean |gray − gaussian(gray)|, a cheap noise / local-variance proxy.
pub fn gaussian_residual(gray: &GrayImage, sigma: f32) -> f64 {
    if gray.as_raw().is_empty() {
        return 0.0;
    }
    let blurred = gaussian_blur_f32(gray, sigma);
    let total: u64 = gray
        .as_raw()
        .iter()
        .zip(blurred.as_raw())
        .map(|(&a, &b)| (a as i32 - b as i32).unsigned_abs() as u64)
        .sum();
    total as f64 / gray.as_raw().len() as f64
}

// ============================================================================
// EDGES
// ============================================================================

/// Canny with the fixed 50/150 hysteresis pair used throughout.
pub fn edges(gray: &GrayImage) -> GrayImage {
    if gray.width() < 3 || gray.height() < 3 {
        return GrayImage::new(gray.width(), gray.height());
    }
    canny(gray, CANNY_LOW, CANNY_HIGH)
}

pub fn edge_fraction(gray: &GrayImage) -> f64 {
    let n = gray.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let e = edges(gray);
    e.as_raw().iter().filter(|&&v| v > 0).count() as f64 / n as f64
}
