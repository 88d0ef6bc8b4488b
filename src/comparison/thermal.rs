// src/comparison/thermal.rs
//
// Infrared category. With an IR signature on both sides the score is
// driven by the material around the plate; otherwise a coarser
// whole-image comparison stands in.

use super::matching::best_similarity;
use super::sanitize::{safe, NEUTRAL};
use super::similarity::{cosine, grid, shadow_points, size_similarity};
use crate::types::{HeatPattern, InfraredFeatures, IRSignature, ReflectiveElement};

const MATCH_THRESHOLD: f64 = 0.3;
const REFLECTIVE_DISTANCE_SCALE: f64 = 30.0;

pub fn thermal(a: &InfraredFeatures, b: &InfraredFeatures) -> f64 {
    match (&a.ir_signature, &b.ir_signature) {
        (Some(sa), Some(sb)) => ir_signature(sa, sb),
        _ => fallback(a, b),
    }
}

/// Reflectivity grid and material dominate; shadows, illumination and
/// texture refine.
pub fn ir_signature(a: &IRSignature, b: &IRSignature) -> f64 {
    let reflectivity = grid(&a.reflectivity_map, &b.reflectivity_map);
    let material = cosine(&a.material_signature, &b.material_signature);
    let shadows = shadow_points(&a.shadow_patterns, &b.shadow_patterns);
    let illumination = cosine(&a.illumination_gradient, &b.illumination_gradient);
    let texture = cosine(&a.texture_features, &b.texture_features);
    safe(
        0.35 * reflectivity + 0.30 * material + 0.15 * shadows + 0.10 * illumination + 0.10 * texture,
        NEUTRAL,
    )
}

fn fallback(a: &InfraredFeatures, b: &InfraredFeatures) -> f64 {
    let histogram = cosine(&a.thermal_signature, &b.thermal_signature);
    let reflective = reflective_elements(&a.reflective_elements, &b.reflective_elements);
    let heat = heat_patterns(&a.heat_patterns, &b.heat_patterns);
    let material = cosine(&a.material_signature, &b.material_signature);
    safe(0.3 * histogram + 0.3 * reflective + 0.2 * heat + 0.2 * material, NEUTRAL)
}

pub fn reflective_elements(a: &[ReflectiveElement], b: &[ReflectiveElement]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    best_similarity(a, b, MATCH_THRESHOLD, |x, y| {
        let position = (-x.position.distance(&y.position) / REFLECTIVE_DISTANCE_SCALE).exp();
        let intensity = 1.0 - (x.intensity - y.intensity).abs();
        Some(safe(
            0.5 * position + 0.25 * intensity + 0.25 * size_similarity(x.size, y.size),
            0.0,
        ))
    })
    .mean()
    .unwrap_or(0.0)
}

/// Paired by grid index. Each pair averages temperature agreement with
/// gradient agreement (gradients lie in [−1, 1]).
pub fn heat_patterns(a: &[HeatPattern], b: &[HeatPattern]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let pairs = a.len().min(b.len());
    if pairs == 0 {
        return 0.0;
    }
    let total: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let temperature = 1.0 - (x.temperature - y.temperature).abs();
            let diff: f64 = x
                .gradient
                .iter()
                .zip(&y.gradient)
                .map(|(g, h)| (g - h).abs())
                .sum::<f64>()
                / x.gradient.len() as f64;
            (temperature + (1.0 - diff / 2.0)) / 2.0
        })
        .sum();
    safe(total / pairs as f64, NEUTRAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlobShape, Bounds, LicensePlateRegion, Point2D};
    use approx::assert_abs_diff_eq;

    fn signature(cell: f64) -> IRSignature {
        IRSignature {
            plate_region: LicensePlateRegion {
                bounds: Bounds::new(260, 360, 120, 40),
                confidence: 0.9,
                avg_brightness: 235.0,
                is_reflective: true,
            },
            surrounding_region: Bounds::new(170, 330, 300, 100),
            reflectivity_map: vec![vec![cell; 8]; 8],
            material_signature: [0.16, 0.84, 0.0, 0.02, 0.1, 0.18],
            illumination_gradient: [0.4, 0.4, 0.4, 0.4],
            shadow_patterns: vec![Point2D::new(200.0, 350.0)],
            texture_features: [0.01, 0.05, 0.5, 0.3],
        }
    }

    fn infrared(sig: Option<IRSignature>) -> InfraredFeatures {
        InfraredFeatures {
            thermal_signature: [0.1, 0.2, 0.3, 0.1, 0.1, 0.1, 0.05, 0.05],
            reflective_elements: vec![ReflectiveElement {
                position: Point2D::new(300.0, 380.0),
                intensity: 0.95,
                size: 4000.0,
                shape: BlobShape::Angular,
            }],
            heat_patterns: vec![HeatPattern {
                region: Bounds::new(0, 0, 320, 240),
                temperature: 0.3,
                gradient: [0.1, -0.1, 0.0, 0.05],
            }],
            material_signature: [0.1, 0.6, 0.2, 0.05, 0.1, 0.2],
            ir_signature: sig,
        }
    }

    #[test]
    fn test_identical_signatures() {
        let s = signature(0.4);
        assert_abs_diff_eq!(ir_signature(&s, &s), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_different_surround_lowers_score() {
        let a = signature(0.4);
        let b = signature(0.9);
        let s = ir_signature(&a, &b);
        // Only the 0.35 grid share drops: 1 − 0.5 mean difference.
        assert_abs_diff_eq!(s, 1.0 - 0.35 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_mismatch_zeroes_only_its_share() {
        let a = signature(0.4);
        let mut b = signature(0.4);
        b.reflectivity_map = vec![vec![0.4; 4]; 4];
        assert_abs_diff_eq!(ir_signature(&a, &b), 0.65, epsilon = 1e-12);
    }

    #[test]
    fn test_fallback_without_signature() {
        let a = infrared(None);
        assert_abs_diff_eq!(thermal(&a, &a), 1.0, epsilon = 1e-12);
        // One-sided signature also falls back.
        let b = infrared(Some(signature(0.4)));
        assert_abs_diff_eq!(thermal(&a, &b), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heat_patterns() {
        let p = |t: f64| HeatPattern {
            region: Bounds::new(0, 0, 10, 10),
            temperature: t,
            gradient: [0.0; 4],
        };
        assert_abs_diff_eq!(heat_patterns(&[p(0.2)], &[p(0.6)]), 0.8, epsilon = 1e-12);
        assert_eq!(heat_patterns(&[], &[]), 1.0);
        assert_eq!(heat_patterns(&[p(0.2)], &[]), 0.0);
    }
}
