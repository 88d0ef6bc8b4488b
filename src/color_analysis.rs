// src/color_analysis.rs
//
// HSV and RGB color analysis for vehicle images.
//
// Used by:
//   - the lighting classifier (mean saturation)
//   - taillight detection (red hue mask, with wraparound)
//   - the daylight color profile (quantized dominant colors)

use crate::raster::Raster;
use crate::types::{Color, ColorProfile};
use image::{GrayImage, Luma, RgbImage};
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Red hue lies within this many degrees of 0°/360°.
const RED_HUE_SPAN: f32 = 20.0;
/// Minimum saturation for the red mask, on the 0-100 scale (50/255).
const RED_MIN_SATURATION: f32 = 19.6;
/// Minimum value for the red mask, on the 0-255 scale.
const RED_MIN_VALUE: f32 = 50.0;

const QUANT_LEVELS: u32 = 4;
const QUANT_STEP: u32 = 256 / QUANT_LEVELS;
pub const MAX_DOMINANT_COLORS: usize = 5;

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    // Hue
    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 {
        0.0
    } else {
        (delta / max) * 100.0
    };

    (h, s, max * 255.0)
}

// ============================================================================
// RED MASK
// ============================================================================

/// Which side of the hue circle counts as red.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedHue {
    /// 0-20° only.
    Low,
    /// 0-20° and 340-360°, covering the wraparound.
    Wrapped,
}

/// Foreground (255) where a pixel is saturated, bright enough and red.
pub fn red_mask(rgb: &RgbImage, hue: RedHue) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (x, y, px) in rgb.enumerate_pixels() {
        let (hh, s, v) = rgb_to_hsv(px[0] as f32, px[1] as f32, px[2] as f32);
        if s < RED_MIN_SATURATION || v < RED_MIN_VALUE {
            continue;
        }
        let red = hh <= RED_HUE_SPAN || (hue == RedHue::Wrapped && hh >= 360.0 - RED_HUE_SPAN);
        if red {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Mean HSV saturation normalized to [0, 1]; 0 for single-channel rasters.
pub fn mean_saturation(raster: &Raster) -> f64 {
    let Some(rgb) = raster.to_rgb() else {
        return 0.0;
    };
    let n = rgb.pixels().len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = rgb
        .pixels()
        .map(|px| rgb_to_hsv(px[0] as f32, px[1] as f32, px[2] as f32).1 as f64)
        .sum();
    total / n as f64 / 100.0
}

// ============================================================================
// COLOR PROFILE
// ============================================================================

/// Dominant colors from a 4-level-per-channel quantization plus the
/// 256-bin grayscale histogram.
pub fn color_profile(raster: &Raster) -> ColorProfile {
    let gray = raster.to_gray();
    let histogram = crate::vision::stats::histogram(&gray).to_vec();
    let total = raster.pixel_count();
    if total == 0 {
        return ColorProfile {
            dominant_colors: Vec::new(),
            histogram,
        };
    }

    let mut bins = vec![0u32; (QUANT_LEVELS * QUANT_LEVELS * QUANT_LEVELS) as usize];
    match raster.to_rgb() {
        Some(rgb) => {
            for px in rgb.pixels() {
                let (r, g, b) = (quant(px[0]), quant(px[1]), quant(px[2]));
                bins[((r * QUANT_LEVELS + g) * QUANT_LEVELS + b) as usize] += 1;
            }
        }
        None => {
            for &v in gray.as_raw() {
                let q = quant(v);
                bins[((q * QUANT_LEVELS + q) * QUANT_LEVELS + q) as usize] += 1;
            }
        }
    }

    // Stable sort keeps bin order on ties.
    let mut ranked: Vec<(usize, u32)> = bins
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, c)| *c > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let dominant_colors: Vec<Color> = ranked
        .into_iter()
        .take(MAX_DOMINANT_COLORS)
        .map(|(bin, count)| {
            let bin = bin as u32;
            let b = bin % QUANT_LEVELS;
            let g = (bin / QUANT_LEVELS) % QUANT_LEVELS;
            let r = bin / (QUANT_LEVELS * QUANT_LEVELS);
            Color {
                r: bin_center(r),
                g: bin_center(g),
                b: bin_center(b),
                weight: count as f64 / total as f64,
            }
        })
        .collect();

    debug!(
        "🎨 Color profile: {} dominant color(s), top weight {:.2}",
        dominant_colors.len(),
        dominant_colors.first().map(|c| c.weight).unwrap_or(0.0)
    );

    ColorProfile {
        dominant_colors,
        histogram,
    }
}

#[inline]
fn quant(v: u8) -> u32 {
    v as u32 / QUANT_STEP
}

#[inline]
fn bin_center(level: u32) -> u8 {
    (level * QUANT_STEP + QUANT_STEP / 2) as u8
}

// ============================================================================
// TESTS
// ============================================================================
