// src/extraction/infrared.rs
//
// Whole-image infrared features. The IR signature around the plate is
// the discriminating part; the thermal histogram, reflective blobs and
// quadrant heat patterns back the coarser comparison used when a feature
// set carries no signature.

use super::ir_signature::{self, material_signature};
use crate::types::{
    BlobShape, Bounds, HeatPattern, InfraredFeatures, ReflectiveElement, ILLUMINATION_DIRECTIONS,
    THERMAL_SIGNATURE_LEN,
};
use crate::vision::{external_regions, stats, threshold};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

const REFLECTIVE_THRESHOLD: u8 = 220;
const MIN_REFLECTIVE_AREA: f64 = 30.0;
const ROUND_CIRCULARITY: f64 = 0.7;
const HEAT_GRID: i32 = 2;

// ============================================================================
// EXTRACTION
// ============================================================================

pub fn extract(gray: &GrayImage) -> InfraredFeatures {
    let features = InfraredFeatures {
        thermal_signature: thermal_signature(gray),
        reflective_elements: reflective_elements(gray),
        heat_patterns: heat_patterns(gray),
        material_signature: material_signature(gray),
        ir_signature: Some(ir_signature::extract(gray)),
    };
    debug!(
        "🌙 Infrared: {} reflective element(s), {} heat pattern(s)",
        features.reflective_elements.len(),
        features.heat_patterns.len()
    );
    features
}

/// 8-bin intensity histogram, normalized to sum to 1 (all zero when empty).
pub fn thermal_signature(gray: &GrayImage) -> [f64; THERMAL_SIGNATURE_LEN] {
    let mut bins = [0.0; THERMAL_SIGNATURE_LEN];
    let total = gray.as_raw().len();
    if total == 0 {
        return bins;
    }
    let width = 256 / THERMAL_SIGNATURE_LEN;
    for &v in gray.as_raw() {
        bins[v as usize / width] += 1.0;
    }
    for b in bins.iter_mut() {
        *b /= total as f64;
    }
    bins
}

fn reflective_elements(gray: &GrayImage) -> Vec<ReflectiveElement> {
    let mask = threshold::above(gray, REFLECTIVE_THRESHOLD);
    external_regions(&mask)
        .into_iter()
        .filter(|r| r.area >= MIN_REFLECTIVE_AREA)
        .map(|r| ReflectiveElement {
            position: r.center(),
            intensity: stats::region_mean(gray, &r.bounds) / 255.0,
            size: r.area,
            shape: if r.circularity() > ROUND_CIRCULARITY {
                BlobShape::Round
            } else {
                BlobShape::Angular
            },
        })
        .collect()
}

/// Quadrants in row-major order. Each gradient entry is the mean of the
/// half facing that direction (top, right, bottom, left) minus the
/// quadrant mean, over 255.
fn heat_patterns(gray: &GrayImage) -> Vec<HeatPattern> {
    let cell_w = gray.width() as i32 / HEAT_GRID;
    let cell_h = gray.height() as i32 / HEAT_GRID;
    if cell_w == 0 || cell_h == 0 {
        return Vec::new();
    }

    let mut patterns = Vec::with_capacity((HEAT_GRID * HEAT_GRID) as usize);
    for row in 0..HEAT_GRID {
        for col in 0..HEAT_GRID {
            let region = Bounds::new(col * cell_w, row * cell_h, cell_w, cell_h);
            let mean = stats::region_mean(gray, &region);
            let halves = [
                Bounds::new(region.x, region.y, cell_w, cell_h / 2),
                Bounds::new(region.x + cell_w / 2, region.y, cell_w - cell_w / 2, cell_h),
                Bounds::new(region.x, region.y + cell_h / 2, cell_w, cell_h - cell_h / 2),
                Bounds::new(region.x, region.y, cell_w / 2, cell_h),
            ];
            let mut gradient = [0.0; ILLUMINATION_DIRECTIONS];
            for (g, half) in gradient.iter_mut().zip(halves.iter()) {
                if !half.is_empty() {
                    *g = (stats::region_mean(gray, half) - mean) / 255.0;
                }
            }
            patterns.push(HeatPattern {
                region,
                temperature: mean / 255.0,
                gradient,
            });
        }
    }
    patterns
}
