// src/preprocessing/quality.rs
//
// Image quality score in [0, 1] from four independent sub-scores.
// Never fails: every degenerate input resolves to a finite score.

use crate::raster::Raster;
use crate::vision::stats;
use image::GrayImage;
use serde::Serialize;

// ============================================================================
// CONFIGURATION
// ============================================================================

const BLUR_VARIANCE_REF: f64 = 100.0; // Laplacian variance of a "sharp" image
const CONTRAST_STD_REF: f64 = 64.0;
const NOISE_RESIDUAL_REF: f64 = 20.0;
const NOISE_BLUR_SIGMA: f32 = 1.0; // ≈ 5×5 kernel
const REF_WIDTH: f64 = 640.0;
const REF_HEIGHT: f64 = 480.0;

const W_BLUR: f64 = 0.3;
const W_CONTRAST: f64 = 0.3;
const W_NOISE: f64 = 0.2;
const W_RESOLUTION: f64 = 0.2;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReport {
    pub blur: f64,
    pub contrast: f64,
    pub noise: f64,
    pub resolution: f64,
    pub score: f64,
}

// ============================================================================
// SCORING
// ============================================================================

pub fn assess(raster: &Raster) -> f64 {
    assess_detailed(raster).score
}

pub fn assess_detailed(raster: &Raster) -> QualityReport {
    let gray = raster.to_gray();
    let blur = blur_score(&gray);
    let contrast = contrast_score(&gray);
    let noise = noise_score(&gray);
    let resolution = resolution_score(raster.width(), raster.height());

    let score = W_BLUR * blur + W_CONTRAST * contrast + W_NOISE * noise + W_RESOLUTION * resolution;

    QualityReport {
        blur,
        contrast,
        noise,
        resolution,
        score: unit(score),
    }
}

fn blur_score(gray: &GrayImage) -> f64 {
    let (variance, _) = stats::laplacian_stats(gray);
    unit(variance / BLUR_VARIANCE_REF)
}

fn contrast_score(gray: &GrayImage) -> f64 {
    let (_, std) = stats::mean_std(gray);
    unit(std / CONTRAST_STD_REF)
}

fn noise_score(gray: &GrayImage) -> f64 {
    let residual = stats::gaussian_residual(gray, NOISE_BLUR_SIGMA);
    unit(1.0 - residual / NOISE_RESIDUAL_REF)
}

fn resolution_score(width: u32, height: u32) -> f64 {
    let w = (width as f64 / REF_WIDTH).min(1.0);
    let h = (height as f64 / REF_HEIGHT).min(1.0);
    unit((w + h) / 2.0)
}

/// Clamp to [0, 1]; non-finite values collapse to 0.
fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
