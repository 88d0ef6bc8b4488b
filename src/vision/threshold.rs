// src/vision/threshold.rs
//
// Binary masks. Foreground is 255, background 0, matching the
// convention `imageproc::contours::find_contours` expects (nonzero = object).

use super::integral::IntegralImage;
use crate::types::Bounds;
use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Pixels strictly brighter than `thresh` become foreground.
pub fn above(gray: &GrayImage, thresh: u8) -> GrayImage {
    threshold(gray, thresh, ThresholdType::Binary)
}

/// Pixels strictly darker than `thresh` become foreground.
pub fn below(gray: &GrayImage, thresh: u8) -> GrayImage {
    match thresh.checked_sub(1) {
        Some(t) => threshold(gray, t, ThresholdType::BinaryInverted),
        None => GrayImage::new(gray.width(), gray.height()),
    }
}

/// Pixels with `lo < v <= hi`.
pub fn band(gray: &GrayImage, lo: u8, hi: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let data = gray
        .as_raw()
        .iter()
        .map(|&v| if v > lo && v <= hi { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// Mean adaptive threshold: foreground where `v > mean(block) - c`.
/// The block is clipped at the borders rather than padded.
pub fn adaptive_mean(gray: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let (w, h) = gray.dimensions();
    let integral = IntegralImage::new(gray);
    let radius = (block_size / 2) as i32;
    let mut out = GrayImage::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let window = Bounds::new(
                x as i32 - radius,
                y as i32 - radius,
                2 * radius + 1,
                2 * radius + 1,
            );
            let t = integral.mean(&window) - c;
            if gray.get_pixel(x, y).0[0] as f64 > t {
                out.put_pixel(x, y, Luma([255]));
            }
        }
    }
    out
}

/// Pixel-wise OR of two same-sized masks.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (w, h) = a.dimensions();
    if b.dimensions() != (w, h) {
        return a.clone();
    }
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| if p > 0 || q > 0 { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// Morphological opening with a (2r+1)×(2r+1) square.
pub fn open_square(mask: &GrayImage, radius: u8) -> GrayImage {
    morphology::open(mask, Norm::LInf, radius)
}

/// Copy of the region, clipped to the image.
pub fn crop(gray: &GrayImage, bounds: &Bounds) -> GrayImage {
    let b = bounds.clip_to(gray.width(), gray.height());
    if b.is_empty() {
        return GrayImage::new(0, 0);
    }
    image::imageops::crop_imm(gray, b.x as u32, b.y as u32, b.width as u32, b.height as u32)
        .to_image()
}

pub fn count_foreground(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v > 0).count()
}
