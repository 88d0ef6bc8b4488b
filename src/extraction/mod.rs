// src/extraction/mod.rs
//
// Feature extraction: independent extractors, each consuming a labelled
// image and producing one named feature block. The pipeline runs them in
// parallel and assembles the blocks into a VehicleFeatures set.
//
// Adding an extractor means implementing `FeatureExtractor` and
// registering it; the orchestration below does not change.

pub mod bumper;
pub mod daylight;
pub mod geometric;
pub mod infrared;
pub mod ir_signature;
pub mod lighting;
pub mod lights;
pub mod plate;

use crate::error::{CompareError, Result};
use crate::types::{
    BumperFeatures, GeometricFeatures, LightPatternFeatures, LightingFeatures, VehicleFeatures,
    VehicleImage,
};
use rayon::prelude::*;
use tracing::debug;

pub use bumper::BumperExtractor;
pub use geometric::GeometricExtractor;
pub use lighting::LightingFeatureExtractor;
pub use lights::LightPatternExtractor;

// ============================================================================
// CONFIGURATION
// ============================================================================

const QUALITY_REFERENCE_POINTS: f64 = 0.8;
const QUALITY_LIGHT_ELEMENTS: f64 = 0.9;
const QUALITY_LIGHTING_BLOCK: f64 = 0.7;
const QUALITY_COMPONENTS: f64 = 3.0;

// ============================================================================
// TYPES
// ============================================================================

/// Output of a single extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureBlock {
    Geometric(GeometricFeatures),
    LightPattern(LightPatternFeatures),
    Bumper(BumperFeatures),
    Lighting(LightingFeatures),
}

impl FeatureBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureBlock::Geometric(_) => "geometric",
            FeatureBlock::LightPattern(_) => "light_pattern",
            FeatureBlock::Bumper(_) => "bumper",
            FeatureBlock::Lighting(_) => "lighting",
        }
    }
}

pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, image: &VehicleImage) -> Result<FeatureBlock>;
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct ExtractionPipeline {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExtractionPipeline {
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Geometric, light pattern, bumper and lighting-specific extractors.
    pub fn standard() -> Self {
        Self::empty()
            .with(GeometricExtractor)
            .with(LightPatternExtractor::default())
            .with(BumperExtractor)
            .with(LightingFeatureExtractor)
    }

    pub fn with<E: FeatureExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Runs every extractor concurrently; the first failure wins.
    pub fn extract(&self, image: &VehicleImage) -> Result<VehicleFeatures> {
        let blocks: Vec<FeatureBlock> = self
            .extractors
            .par_iter()
            .map(|e| {
                let block = e.extract(image)?;
                debug!("Extractor '{}' produced {} block", e.name(), block.kind());
                Ok(block)
            })
            .collect::<Result<Vec<_>>>()?;
        assemble(image, blocks)
    }
}

/// Convenience wrapper over the standard pipeline.
pub fn extract_features(image: &VehicleImage) -> Result<VehicleFeatures> {
    ExtractionPipeline::standard().extract(image)
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Later blocks of the same kind replace earlier ones.
fn assemble(image: &VehicleImage, blocks: Vec<FeatureBlock>) -> Result<VehicleFeatures> {
    let mut geometric = None;
    let mut light_patterns = None;
    let mut bumper = None;
    let mut lighting = None;

    for block in blocks {
        match block {
            FeatureBlock::Geometric(g) => geometric = Some(g),
            FeatureBlock::LightPattern(l) => light_patterns = Some(l),
            FeatureBlock::Bumper(b) => bumper = Some(b),
            FeatureBlock::Lighting(l) => lighting = Some(l),
        }
    }

    let lighting_features = lighting.ok_or(CompareError::MissingFeatureBlock { block: "lighting" })?;
    let mut features = VehicleFeatures {
        view: image.view,
        geometric_features: geometric.ok_or(CompareError::MissingFeatureBlock { block: "geometric" })?,
        light_patterns: light_patterns
            .ok_or(CompareError::MissingFeatureBlock { block: "light_pattern" })?,
        bumper_features: bumper.ok_or(CompareError::MissingFeatureBlock { block: "bumper" })?,
        lighting_features,
        extraction_quality: 0.0,
    };
    features.extraction_quality = extraction_quality(&features);
    Ok(features)
}

/// Completeness heuristic: reference points, light elements and the
/// lighting-specific block each contribute a fixed credit.
pub fn extraction_quality(features: &VehicleFeatures) -> f64 {
    let mut q = 0.0;
    if !features.geometric_features.reference_points.is_empty() {
        q += QUALITY_REFERENCE_POINTS;
    }
    if !features.light_patterns.light_elements.is_empty() {
        q += QUALITY_LIGHT_ELEMENTS;
    }
    // The variant is always present once assembled.
    q += QUALITY_LIGHTING_BLOCK;
    q / QUALITY_COMPONENTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use crate::types::{LightingType, VehicleView};
    use approx::assert_abs_diff_eq;
    use image::{GrayImage, Luma};

    struct FailingExtractor;

    impl FeatureExtractor for FailingExtractor {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(&self, _image: &VehicleImage) -> Result<FeatureBlock> {
            Err(CompareError::UnsupportedLighting)
        }
    }

    fn ir_image() -> VehicleImage {
        let raster = Raster::from_gray(GrayImage::from_pixel(160, 120, Luma([40])));
        VehicleImage::new(raster, VehicleView::Rear, LightingType::Infrared, 0.9)
    }

    #[test]
    fn test_standard_pipeline_has_four_extractors() {
        assert_eq!(
            ExtractionPipeline::standard().names(),
            vec!["geometric", "light_pattern", "bumper", "lighting"]
        );
    }

    #[test]
    fn test_missing_block_is_reported() {
        let pipeline = ExtractionPipeline::empty().with(GeometricExtractor);
        let err = pipeline.extract(&ir_image()).unwrap_err();
        assert!(matches!(err, CompareError::MissingFeatureBlock { .. }));
    }

    #[test]
    fn test_extractor_failure_propagates() {
        let pipeline = ExtractionPipeline::standard().with(FailingExtractor);
        assert_eq!(
            pipeline.extract(&ir_image()).unwrap_err(),
            CompareError::UnsupportedLighting
        );
    }

    #[test]
    fn test_dark_frame_quality_counts_corners_and_block() {
        let features = extract_features(&ir_image()).unwrap();
        assert_eq!(features.lighting(), LightingType::Infrared);
        assert!(features.light_patterns.light_elements.is_empty());
        // Corners only: (0.8 + 0.7) / 3.
        assert_abs_diff_eq!(features.extraction_quality, 0.5, epsilon = 1e-12);
    }
}
