// src/error.rs
//
// Terminal failures of the comparison pipeline. Numeric degradation and
// detection fallbacks are never reported here; they only lower scores.

use thiserror::Error;

/// Which of the two compared images a gate rejected.
pub type ImageSlot = u8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompareError {
    /// The image source could not produce a raster.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Pixel buffer length disagrees with the declared geometry.
    #[error("invalid raster: expected {expected} bytes, got {actual}")]
    InvalidRaster { expected: usize, actual: usize },

    /// Hard reject before classification.
    #[error("image {image} quality too low: {score:.3} < {threshold:.2}")]
    QualityTooLow {
        image: ImageSlot,
        score: f64,
        threshold: f64,
    },

    /// View or lighting could not be determined confidently.
    #[error(
        "image {image}: unable to determine {aspect} with sufficient confidence: {confidence:.3} < {threshold:.2}"
    )]
    LowClassificationConfidence {
        image: ImageSlot,
        aspect: &'static str,
        confidence: f64,
        threshold: f64,
    },

    #[error("vehicle views do not match: {first} vs {second}")]
    ViewMismatch { first: String, second: String },

    #[error("lighting conditions do not match: {first} vs {second}")]
    LightingMismatch { first: String, second: String },

    /// Post-classification consistency gate.
    #[error("image {image} has insufficient quality for comparison: {score:.3} < {threshold:.2}")]
    InsufficientQuality {
        image: ImageSlot,
        score: f64,
        threshold: f64,
    },

    /// The comparison engine refused feature sets built out of band.
    #[error("incompatible feature sets: {reason}")]
    IncompatibleFeatures { reason: String },

    #[error("features cannot be extracted for unknown lighting")]
    UnsupportedLighting,

    #[error("feature extraction produced no {block} block")]
    MissingFeatureBlock { block: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompareError {
    /// True for the gate rejections of a valid input pair (as opposed to
    /// decode or configuration problems).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CompareError::QualityTooLow { .. }
                | CompareError::LowClassificationConfidence { .. }
                | CompareError::ViewMismatch { .. }
                | CompareError::LightingMismatch { .. }
                | CompareError::InsufficientQuality { .. }
                | CompareError::IncompatibleFeatures { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
