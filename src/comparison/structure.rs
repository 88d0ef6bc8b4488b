// src/comparison/structure.rs
//
// Lighting-independent categories: body geometry, light pattern and
// bumper. Each category is a fixed blend of sub-scores.

use super::matching::best_similarity;
use super::sanitize::{safe, NEUTRAL};
use super::similarity::{
    contour_points, cosine, plate_area, ratio_similarity, reference_points, size_similarity,
};
use crate::types::{
    BumperFeatures, GeometricFeatures, LightConfiguration, LightElement, LightPatternFeatures,
    StructuralElement, VehicleProportions,
};

// ============================================================================
// CONFIGURATION
// ============================================================================

const MATCH_THRESHOLD: f64 = 0.3;
const STRUCTURE_DISTANCE_SCALE: f64 = 50.0;
const LIGHT_DISTANCE_SCALE: f64 = 30.0;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Geometric category together with its reference-point alignment, which
/// is also reported on its own as the alignment quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricScore {
    pub similarity: f64,
    pub alignment: f64,
}

pub fn geometric(a: &GeometricFeatures, b: &GeometricFeatures) -> GeometricScore {
    let proportions = proportions(&a.vehicle_proportions, &b.vehicle_proportions);
    let structure = structural_elements(&a.structural_elements, &b.structural_elements);
    let alignment = reference_points(&a.reference_points, &b.reference_points);
    GeometricScore {
        similarity: safe(0.4 * proportions + 0.4 * structure + 0.2 * alignment, NEUTRAL),
        alignment,
    }
}

/// A missing plate (ratio 0) on either side is not held against the pair.
pub fn proportions(a: &VehicleProportions, b: &VehicleProportions) -> f64 {
    let width_height = ratio_similarity(a.width_height_ratio, b.width_height_ratio, NEUTRAL);
    let upper_lower = ratio_similarity(a.upper_lower_ratio, b.upper_lower_ratio, NEUTRAL);
    let plate = if a.license_plate_ratio > 0.0 && b.license_plate_ratio > 0.0 {
        ratio_similarity(a.license_plate_ratio, b.license_plate_ratio, 1.0)
    } else {
        1.0
    };
    safe(0.4 * width_height + 0.4 * upper_lower + 0.2 * plate, NEUTRAL)
}

pub fn structural_elements(a: &[StructuralElement], b: &[StructuralElement]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let m = best_similarity(a, b, MATCH_THRESHOLD, |x, y| {
        (x.kind == y.kind).then(|| {
            let position = (-x.position.distance(&y.position) / STRUCTURE_DISTANCE_SCALE).exp();
            safe(0.7 * position + 0.3 * size_similarity(x.size, y.size), 0.0)
        })
    });
    m.mean().map_or(0.0, |v| safe(v, NEUTRAL))
}

// ============================================================================
// LIGHT PATTERN
// ============================================================================

pub fn light_pattern(a: &LightPatternFeatures, b: &LightPatternFeatures) -> f64 {
    let signature = cosine(&a.pattern_signature, &b.pattern_signature);
    let elements = light_elements(&a.light_elements, &b.light_elements);
    let config = light_configuration(&a.light_configuration, &b.light_configuration);
    safe(0.4 * signature + 0.4 * elements + 0.2 * config, NEUTRAL)
}

pub fn light_elements(a: &[LightElement], b: &[LightElement]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    best_similarity(a, b, MATCH_THRESHOLD, |x, y| {
        (x.kind == y.kind).then(|| light_element(x, y))
    })
    .mean()
    .unwrap_or(0.0)
}

fn light_element(a: &LightElement, b: &LightElement) -> f64 {
    let position = (-a.position.distance(&b.position) / LIGHT_DISTANCE_SCALE).exp();
    let shape = if a.shape == b.shape { 1.0 } else { 0.0 };
    let size = size_similarity(a.size, b.size);
    let intensity = 1.0 - (a.intensity - b.intensity).abs();
    safe(0.4 * position + 0.2 * shape + 0.2 * size + 0.2 * intensity, 0.0)
}

/// Spacing only counts when both sides measured one.
pub fn light_configuration(a: &LightConfiguration, b: &LightConfiguration) -> f64 {
    let count = ratio_similarity(a.num_elements as f64, b.num_elements as f64, NEUTRAL);
    let symmetry = 1.0 - (a.symmetry - b.symmetry).abs();
    let spacing = if a.spacing > 0.0 && b.spacing > 0.0 {
        ratio_similarity(a.spacing, b.spacing, 1.0)
    } else {
        1.0
    };
    safe(0.4 * count + 0.3 * symmetry + 0.3 * spacing, NEUTRAL)
}

// ============================================================================
// BUMPER
// ============================================================================

pub fn bumper(a: &BumperFeatures, b: &BumperFeatures) -> f64 {
    let contour = contour_points(&a.contour_signature, &b.contour_signature);
    let texture = cosine(&a.texture_features, &b.texture_features);
    let mounting = reference_points(&a.mounting_points, &b.mounting_points);
    let plate = plate_area(&a.license_plate_area, &b.license_plate_area);
    safe(0.3 * contour + 0.3 * texture + 0.2 * mounting + 0.2 * plate, NEUTRAL)
}
