// src/comparison/sanitize.rs
//
// Last line of defence before scores leave the engine: non-finite values
// become a documented default and every score is clamped into [0, 1].

use crate::types::{ComparisonResult, DetailedScores, ProcessingInfo};
use tracing::warn;

/// Neutral value for a score that could not be computed.
pub const NEUTRAL: f64 = 0.5;

/// `default` for NaN / ±∞, otherwise `value` clamped into [0, 1].
pub fn safe(value: f64, default: f64) -> f64 {
    if !value.is_finite() {
        warn!("Non-finite score {} replaced with {}", value, default);
        return default;
    }
    value.clamp(0.0, 1.0)
}

pub fn sanitize_scores(scores: DetailedScores) -> DetailedScores {
    DetailedScores {
        geometric_similarity: safe(scores.geometric_similarity, NEUTRAL),
        light_pattern_similarity: safe(scores.light_pattern_similarity, NEUTRAL),
        bumper_similarity: safe(scores.bumper_similarity, NEUTRAL),
        color_similarity: scores.color_similarity.map(|v| safe(v, NEUTRAL)),
        thermal_similarity: scores.thermal_similarity.map(|v| safe(v, NEUTRAL)),
    }
}

pub fn sanitize_info(info: ProcessingInfo) -> ProcessingInfo {
    ProcessingInfo {
        image1_quality: safe(info.image1_quality, 0.0),
        image2_quality: safe(info.image2_quality, 0.0),
        alignment_quality: safe(info.alignment_quality, NEUTRAL),
        ..info
    }
}

/// Idempotent; safe to apply again after the caller fills in fields.
pub fn sanitize_result(result: ComparisonResult) -> ComparisonResult {
    ComparisonResult {
        similarity_score: safe(result.similarity_score, 0.0),
        detailed_scores: sanitize_scores(result.detailed_scores),
        processing_info: sanitize_info(result.processing_info),
        ..result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfidenceLevel;

    #[test]
    fn test_safe_defaults_and_clamps() {
        assert_eq!(safe(f64::NAN, 0.5), 0.5);
        assert_eq!(safe(f64::INFINITY, 0.0), 0.0);
        assert_eq!(safe(f64::NEG_INFINITY, 0.5), 0.5);
        assert_eq!(safe(1.7, 0.5), 1.0);
        assert_eq!(safe(-0.2, 0.5), 0.0);
        assert_eq!(safe(0.42, 0.5), 0.42);
    }

    #[test]
    fn test_result_has_no_non_finite_values() {
        let raw = ComparisonResult {
            is_same_vehicle: false,
            similarity_score: f64::NAN,
            confidence_level: ConfidenceLevel::Low,
            detailed_scores: DetailedScores {
                geometric_similarity: f64::INFINITY,
                light_pattern_similarity: 2.0,
                bumper_similarity: -1.0,
                color_similarity: None,
                thermal_similarity: Some(f64::NAN),
            },
            processing_info: ProcessingInfo {
                processing_time_ms: 12,
                image1_quality: f64::NAN,
                image2_quality: 0.7,
                alignment_quality: f64::NEG_INFINITY,
                view_consistency: true,
                lighting_consistency: true,
            },
        };
        let clean = sanitize_result(raw);
        assert_eq!(clean.similarity_score, 0.0);
        assert_eq!(clean.detailed_scores.geometric_similarity, 0.5);
        assert_eq!(clean.detailed_scores.light_pattern_similarity, 1.0);
        assert_eq!(clean.detailed_scores.bumper_similarity, 0.0);
        assert_eq!(clean.detailed_scores.color_similarity, None);
        assert_eq!(clean.detailed_scores.thermal_similarity, Some(0.5));
        assert_eq!(clean.processing_info.image1_quality, 0.0);
        assert_eq!(clean.processing_info.alignment_quality, 0.5);
        assert_eq!(clean.processing_info.processing_time_ms, 12);
        assert_eq!(sanitize_result(clean.clone()), clean);
    }
}
