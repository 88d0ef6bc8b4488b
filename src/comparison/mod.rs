// src/comparison/mod.rs
//
// Comparison engine: two feature sets in, one sanitized verdict out.
//
//   geometric ─────┐
//   light pattern ─┤
//   bumper ────────┼→ lighting weight table → overall → threshold → verdict
//   color (day) ───┤                                  └→ confidence level
//   thermal (IR) ──┘
//
// Both sets must share view and lighting; anything else is refused rather
// than scored.

pub mod appearance;
pub mod matching;
pub mod sanitize;
pub mod similarity;
pub mod structure;
pub mod thermal;

use crate::config::{CategoryWeights, ComparisonConfig};
use crate::error::{CompareError, Result};
use crate::types::{
    ComparisonResult, ConfidenceLevel, DetailedScores, LightingFeatures, LightingType,
    ProcessingInfo, VehicleFeatures,
};
use sanitize::{safe, sanitize_result, NEUTRAL};
use tracing::debug;

// ============================================================================
// CONFIDENCE
// ============================================================================

const HIGH_QUALITY: f64 = 0.8;
const HIGH_SIMILARITY: f64 = 0.9;
const GOOD_QUALITY: f64 = 0.6;
const GOOD_SIMILARITY: f64 = 0.8;
const MEDIUM_QUALITY: f64 = 0.4;

/// Reliability of a verdict from mean extraction quality and similarity.
pub fn confidence_level(avg_quality: f64, similarity: f64) -> ConfidenceLevel {
    if (avg_quality > HIGH_QUALITY && similarity > HIGH_SIMILARITY)
        || (avg_quality > GOOD_QUALITY && similarity > GOOD_SIMILARITY)
    {
        ConfidenceLevel::High
    } else if avg_quality > MEDIUM_QUALITY {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Same-vehicle decision (strictly above the lighting threshold) and its
/// confidence level.
pub fn verdict(
    overall: f64,
    avg_quality: f64,
    lighting: LightingType,
    config: &ComparisonConfig,
) -> (bool, ConfidenceLevel) {
    (
        overall > config.threshold_for(lighting),
        confidence_level(avg_quality, overall),
    )
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    config: ComparisonConfig,
}

impl ComparisonEngine {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn compare(&self, a: &VehicleFeatures, b: &VehicleFeatures) -> Result<ComparisonResult> {
        if a.view != b.view {
            return Err(CompareError::IncompatibleFeatures {
                reason: format!("views differ: {} vs {}", a.view, b.view),
            });
        }
        if a.lighting() != b.lighting() {
            return Err(CompareError::IncompatibleFeatures {
                reason: format!("lighting differs: {} vs {}", a.lighting(), b.lighting()),
            });
        }

        let geometric = structure::geometric(&a.geometric_features, &b.geometric_features);
        let (color_similarity, thermal_similarity) =
            match (&a.lighting_features, &b.lighting_features) {
                (LightingFeatures::Daylight(da), LightingFeatures::Daylight(db)) => {
                    (Some(appearance::color(da, db)), None)
                }
                (LightingFeatures::Infrared(ia), LightingFeatures::Infrared(ib)) => {
                    (None, Some(thermal::thermal(ia, ib)))
                }
                _ => (None, None),
            };

        let scores = DetailedScores {
            geometric_similarity: geometric.similarity,
            light_pattern_similarity: structure::light_pattern(&a.light_patterns, &b.light_patterns),
            bumper_similarity: structure::bumper(&a.bumper_features, &b.bumper_features),
            color_similarity,
            thermal_similarity,
        };

        let lighting = a.lighting();
        let overall = weighted_similarity(&scores, self.config.weights.for_lighting(lighting));
        let threshold = self.config.threshold_for(lighting);
        let avg_quality = (a.extraction_quality + b.extraction_quality) / 2.0;
        let (is_same_vehicle, confidence) = verdict(overall, avg_quality, lighting, &self.config);

        debug!(
            "Scores: geometric {:.3}, light {:.3}, bumper {:.3}, color {:?}, thermal {:?} → {:.3} (threshold {:.2})",
            scores.geometric_similarity,
            scores.light_pattern_similarity,
            scores.bumper_similarity,
            scores.color_similarity,
            scores.thermal_similarity,
            overall,
            threshold
        );

        Ok(sanitize_result(ComparisonResult {
            is_same_vehicle,
            similarity_score: overall,
            confidence_level: confidence,
            detailed_scores: scores,
            processing_info: ProcessingInfo {
                alignment_quality: geometric.alignment,
                view_consistency: true,
                lighting_consistency: true,
                ..ProcessingInfo::default()
            },
        }))
    }
}

/// Absent categories contribute the neutral score; their weight is zero
/// in the matching lighting row.
pub fn weighted_similarity(scores: &DetailedScores, weights: &CategoryWeights) -> f64 {
    let score = |v: f64| safe(v, NEUTRAL);
    let optional = |v: Option<f64>| v.map_or(NEUTRAL, score);
    let overall = score(scores.geometric_similarity) * weights.geometric
        + score(scores.light_pattern_similarity) * weights.light_pattern
        + score(scores.bumper_similarity) * weights.bumper
        + optional(scores.color_similarity) * weights.color
        + optional(scores.thermal_similarity) * weights.thermal;
    safe(overall, NEUTRAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::lights::{light_configuration, pattern_signature};
    use crate::types::{
        Bounds, BumperFeatures, Color, ColorProfile, DaylightFeatures, GeometricFeatures,
        IRSignature, InfraredFeatures, LicensePlateRegion, LightElement, LightPatternFeatures,
        LightShape, LightType, LightingType, Point2D, StructuralElement, StructuralKind,
        TextureSignature, VehicleProportions, VehicleView,
    };
    use approx::assert_abs_diff_eq;

    fn headlights() -> LightPatternFeatures {
        let elements = vec![
            LightElement {
                position: Point2D::new(100.0, 150.0),
                shape: LightShape::Round,
                size: 1200.0,
                intensity: 0.9,
                kind: LightType::Headlight,
            },
            LightElement {
                position: Point2D::new(500.0, 150.0),
                shape: LightShape::Round,
                size: 1200.0,
                intensity: 0.9,
                kind: LightType::Headlight,
            },
        ];
        LightPatternFeatures {
            pattern_signature: pattern_signature(&elements),
            light_configuration: light_configuration(&elements),
            light_elements: elements,
        }
    }

    fn base(view: VehicleView, lighting: LightingFeatures) -> VehicleFeatures {
        VehicleFeatures {
            view,
            geometric_features: GeometricFeatures {
                vehicle_proportions: VehicleProportions {
                    width_height_ratio: 4.0 / 3.0,
                    upper_lower_ratio: 1.2,
                    license_plate_ratio: 0.2,
                },
                structural_elements: vec![StructuralElement {
                    kind: StructuralKind::Grille,
                    position: Point2D::new(320.0, 240.0),
                    size: 900.0,
                }],
                reference_points: vec![
                    Point2D::new(320.0, 240.0),
                    Point2D::new(0.0, 0.0),
                    Point2D::new(639.0, 0.0),
                    Point2D::new(0.0, 479.0),
                    Point2D::new(639.0, 479.0),
                ],
            },
            light_patterns: headlights(),
            bumper_features: BumperFeatures {
                contour_signature: vec![Point2D::new(40.0, 400.0), Point2D::new(50.0, 400.0)],
                texture_features: [0.02, 0.1, 0.05],
                mounting_points: vec![Point2D::new(100.0, 420.0)],
                license_plate_area: Bounds::new(260, 360, 120, 40),
            },
            lighting_features: lighting,
            extraction_quality: 0.8,
        }
    }

    fn daylight() -> LightingFeatures {
        LightingFeatures::Daylight(DaylightFeatures {
            color_profile: ColorProfile {
                dominant_colors: vec![Color {
                    r: 96,
                    g: 96,
                    b: 96,
                    weight: 0.8,
                }],
                histogram: vec![0; 256],
            },
            badge_locations: vec![],
            trim_details: vec![],
            surface_texture: TextureSignature {
                features: [0.01, 0.2, 0.6, 0.4],
                kind: "surface".to_string(),
            },
        })
    }

    fn infrared(cell: f64) -> LightingFeatures {
        LightingFeatures::Infrared(InfraredFeatures {
            thermal_signature: [0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            reflective_elements: vec![],
            heat_patterns: vec![],
            material_signature: [0.1, 0.5, 0.3, 0.05, 0.1, 0.2],
            ir_signature: Some(IRSignature {
                plate_region: LicensePlateRegion {
                    bounds: Bounds::new(260, 360, 120, 40),
                    confidence: 0.9,
                    avg_brightness: 235.0,
                    is_reflective: true,
                },
                surrounding_region: Bounds::new(170, 330, 300, 100),
                reflectivity_map: vec![vec![cell; 8]; 8],
                material_signature: [0.16, 0.84, 0.0, 0.02, 0.1, 0.18],
                illumination_gradient: [0.4; 4],
                shadow_patterns: vec![],
                texture_features: [0.01, 0.05, 0.5, 0.3],
            }),
        })
    }

    #[test]
    fn test_identity_daylight() {
        let f = base(VehicleView::Front, daylight());
        let r = ComparisonEngine::default().compare(&f, &f).unwrap();
        assert!(r.is_same_vehicle);
        assert_abs_diff_eq!(r.similarity_score, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.detailed_scores.geometric_similarity, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.detailed_scores.light_pattern_similarity, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.detailed_scores.color_similarity.unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(r.detailed_scores.thermal_similarity, None);
        assert_eq!(r.confidence_level, ConfidenceLevel::High);
        assert_eq!(r.processing_info.alignment_quality, 1.0);
    }

    #[test]
    fn test_identity_infrared() {
        let f = base(VehicleView::Rear, infrared(0.4));
        let r = ComparisonEngine::default().compare(&f, &f).unwrap();
        assert!(r.is_same_vehicle);
        assert_eq!(r.detailed_scores.color_similarity, None);
        assert_abs_diff_eq!(r.detailed_scores.thermal_similarity.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_incompatible_sets_are_refused() {
        let front = base(VehicleView::Front, daylight());
        let rear = base(VehicleView::Rear, daylight());
        let err = ComparisonEngine::default().compare(&front, &rear).unwrap_err();
        assert!(matches!(err, CompareError::IncompatibleFeatures { .. }));

        let ir = base(VehicleView::Front, infrared(0.4));
        let err = ComparisonEngine::default().compare(&front, &ir).unwrap_err();
        assert!(matches!(err, CompareError::IncompatibleFeatures { .. }));
    }

    #[test]
    fn test_swapped_plate_surround_lowers_thermal() {
        let a = base(VehicleView::Rear, infrared(0.2));
        let b = base(VehicleView::Rear, infrared(0.8));
        let r = ComparisonEngine::default().compare(&a, &b).unwrap();
        let thermal = r.detailed_scores.thermal_similarity.unwrap();
        assert_abs_diff_eq!(thermal, 1.0 - 0.35 * 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_weighted_at_uniform_score() {
        let at = DetailedScores {
            geometric_similarity: 0.75,
            light_pattern_similarity: 0.75,
            bumper_similarity: 0.75,
            color_similarity: Some(0.75),
            thermal_similarity: None,
        };
        let overall = weighted_similarity(&at, &CategoryWeights::DAYLIGHT);
        assert_abs_diff_eq!(overall, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_verdict_threshold_is_strict() {
        let cfg = ComparisonConfig::default();
        let day = LightingType::Daylight;
        let ir = LightingType::Infrared;

        assert!(!verdict(0.75, 0.8, day, &cfg).0);
        assert!(verdict(0.750_000_1, 0.8, day, &cfg).0);
        assert!(!verdict(0.70, 0.8, ir, &cfg).0);
        assert!(verdict(0.700_000_1, 0.8, ir, &cfg).0);

        // Daylight is the stricter row.
        assert!(verdict(0.72, 0.8, ir, &cfg).0);
        assert!(!verdict(0.72, 0.8, day, &cfg).0);
    }

    #[test]
    fn test_verdict_follows_configured_threshold() {
        let cfg = ComparisonConfig {
            daylight_threshold: 0.9,
            ..ComparisonConfig::default()
        };
        assert!(!verdict(0.85, 0.8, LightingType::Daylight, &cfg).0);
        assert!(verdict(0.85, 0.8, LightingType::Infrared, &cfg).0);
    }

    #[test]
    fn test_verdict_confidence_boundaries() {
        let cfg = ComparisonConfig::default();
        let day = LightingType::Daylight;
        assert_eq!(verdict(0.8, 0.9, day, &cfg).1, ConfidenceLevel::Medium);
        assert_eq!(verdict(0.800_001, 0.6, day, &cfg).1, ConfidenceLevel::Medium);
        assert_eq!(verdict(0.800_001, 0.600_001, day, &cfg).1, ConfidenceLevel::High);
        assert_eq!(verdict(0.99, 0.4, day, &cfg).1, ConfidenceLevel::Low);
        assert_eq!(verdict(0.1, 0.400_001, day, &cfg).1, ConfidenceLevel::Medium);
        // Low confidence can accompany either decision.
        assert_eq!(verdict(0.99, 0.3, day, &cfg), (true, ConfidenceLevel::Low));
        assert_eq!(verdict(0.5, 0.9, day, &cfg), (false, ConfidenceLevel::Medium));
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(confidence_level(0.85, 0.95), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.7, 0.85), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.7, 0.5), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.8, 0.8), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.3, 0.99), ConfidenceLevel::Low);
    }

    #[test]
    fn test_weighted_ignores_absent_category_weight() {
        let scores = DetailedScores {
            geometric_similarity: 1.0,
            light_pattern_similarity: 1.0,
            bumper_similarity: 1.0,
            color_similarity: None,
            thermal_similarity: Some(1.0),
        };
        assert_abs_diff_eq!(
            weighted_similarity(&scores, &CategoryWeights::INFRARED),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_deterministic() {
        let a = base(VehicleView::Rear, infrared(0.3));
        let b = base(VehicleView::Rear, infrared(0.5));
        let engine = ComparisonEngine::default();
        assert_eq!(engine.compare(&a, &b).unwrap(), engine.compare(&a, &b).unwrap());
    }
}
