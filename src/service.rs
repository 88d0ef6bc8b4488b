// src/service.rs
//
// Pipeline orchestrator: two rasters in, one sanitized verdict out.
//
//   image 1 ─ quality gate ─ view/lighting ─┐             ┌─ extract ─┐
//                                           ├─ consistency┤           ├─ engine ─→ result
//   image 2 ─ quality gate ─ view/lighting ─┘             └─ extract ─┘
//
// The two images never share mutable state, so each stage runs them on
// separate rayon tasks. Labels come either from the classifier or from
// the caller (capture metadata); every gate applies to both paths.

use crate::comparison::sanitize::sanitize_result;
use crate::comparison::ComparisonEngine;
use crate::config::{EngineConfig, GateConfig};
use crate::error::{CompareError, ImageSlot, Result};
use crate::extraction::ExtractionPipeline;
use crate::preprocessing::{assess, classify_lighting, classify_view};
use crate::raster::Raster;
use crate::types::{ComparisonResult, LightingType, VehicleImage, VehicleView};
use std::time::Instant;
use tracing::{debug, info};

/// View and lighting declared by whoever captured the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLabels {
    pub view: VehicleView,
    pub lighting: LightingType,
}

impl CaptureLabels {
    pub const fn new(view: VehicleView, lighting: LightingType) -> Self {
        Self { view, lighting }
    }
}

pub struct VehicleComparisonService {
    gates: GateConfig,
    pipeline: ExtractionPipeline,
    engine: ComparisonEngine,
}

impl Default for VehicleComparisonService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl VehicleComparisonService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            gates: config.gates,
            pipeline: ExtractionPipeline::standard(),
            engine: ComparisonEngine::new(config.comparison),
        }
    }

    /// Replaces the standard extractor set.
    pub fn with_pipeline(mut self, pipeline: ExtractionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn engine(&self) -> &ComparisonEngine {
        &self.engine
    }

    /// Classifies both images, then compares them.
    pub fn compare(&self, first: &Raster, second: &Raster) -> Result<ComparisonResult> {
        let start = Instant::now();
        let (a, b) = rayon::join(
            || self.prepare_classified(1, first),
            || self.prepare_classified(2, second),
        );
        self.finish(a?, b?, start)
    }

    /// Compares with caller-declared labels; the classifier is skipped but
    /// the quality and consistency gates are not.
    pub fn compare_declared(
        &self,
        first: &Raster,
        first_labels: CaptureLabels,
        second: &Raster,
        second_labels: CaptureLabels,
    ) -> Result<ComparisonResult> {
        let start = Instant::now();
        let (a, b) = rayon::join(
            || self.prepare_declared(1, first, first_labels),
            || self.prepare_declared(2, second, second_labels),
        );
        self.finish(a?, b?, start)
    }

    // ========================================================================
    // PER-IMAGE GATES
    // ========================================================================

    fn prepare_classified(&self, slot: ImageSlot, raster: &Raster) -> Result<VehicleImage> {
        let quality = self.quality_gate(slot, raster)?;

        let view = classify_view(raster);
        self.confidence_gate(slot, "view", view.confidence)?;
        let lighting = classify_lighting(raster);
        self.confidence_gate(slot, "lighting", lighting.confidence)?;

        info!(
            "✅ Image {} accepted: quality {:.3}, {} ({:.2}), {} ({:.2})",
            slot, quality, view.view, view.confidence, lighting.lighting, lighting.confidence
        );
        Ok(VehicleImage::new(raster.clone(), view.view, lighting.lighting, quality))
    }

    fn prepare_declared(
        &self,
        slot: ImageSlot,
        raster: &Raster,
        labels: CaptureLabels,
    ) -> Result<VehicleImage> {
        let quality = self.quality_gate(slot, raster)?;

        // An undeclared label carries no confidence at all.
        if labels.view == VehicleView::Unknown {
            self.confidence_gate(slot, "view", 0.0)?;
        }
        if labels.lighting == LightingType::Unknown {
            self.confidence_gate(slot, "lighting", 0.0)?;
        }

        info!(
            "✅ Image {} accepted: quality {:.3}, declared {} / {}",
            slot, quality, labels.view, labels.lighting
        );
        Ok(VehicleImage::new(raster.clone(), labels.view, labels.lighting, quality))
    }

    fn quality_gate(&self, slot: ImageSlot, raster: &Raster) -> Result<f64> {
        let score = assess(raster);
        debug!("Image {} quality {:.3}", slot, score);
        if score < self.gates.min_quality {
            info!(
                "❌ Image {} rejected: quality {:.3} < {:.2}",
                slot, score, self.gates.min_quality
            );
            return Err(CompareError::QualityTooLow {
                image: slot,
                score,
                threshold: self.gates.min_quality,
            });
        }
        Ok(score)
    }

    fn confidence_gate(&self, slot: ImageSlot, aspect: &'static str, confidence: f64) -> Result<()> {
        let threshold = self.gates.min_classification_confidence;
        if confidence < threshold {
            info!(
                "❌ Image {} rejected: {} confidence {:.3} < {:.2}",
                slot, aspect, confidence, threshold
            );
            return Err(CompareError::LowClassificationConfidence {
                image: slot,
                aspect,
                confidence,
                threshold,
            });
        }
        Ok(())
    }

    // ========================================================================
    // PAIR
    // ========================================================================

    fn finish(&self, a: VehicleImage, b: VehicleImage, start: Instant) -> Result<ComparisonResult> {
        self.check_consistency(&a, &b)?;

        let (fa, fb) = rayon::join(|| self.pipeline.extract(&a), || self.pipeline.extract(&b));
        let (fa, fb) = (fa?, fb?);
        debug!(
            "Extraction quality: {:.3} / {:.3}",
            fa.extraction_quality, fb.extraction_quality
        );

        let mut result = self.engine.compare(&fa, &fb)?;
        let info = &mut result.processing_info;
        info.processing_time_ms = start.elapsed().as_millis() as u64;
        info.image1_quality = a.quality_score;
        info.image2_quality = b.quality_score;
        info.view_consistency = a.view == b.view;
        info.lighting_consistency = a.lighting == b.lighting;
        let result = sanitize_result(result);

        info!(
            "🚗 Same vehicle: {} (similarity {:.3}, confidence {}, {} ms)",
            result.is_same_vehicle,
            result.similarity_score,
            result.confidence_level.as_str(),
            result.processing_info.processing_time_ms
        );
        Ok(result)
    }

    fn check_consistency(&self, a: &VehicleImage, b: &VehicleImage) -> Result<()> {
        if a.view != b.view {
            info!("❌ View mismatch: {} vs {}", a.view, b.view);
            return Err(CompareError::ViewMismatch {
                first: a.view.to_string(),
                second: b.view.to_string(),
            });
        }
        if a.lighting != b.lighting {
            info!("❌ Lighting mismatch: {} vs {}", a.lighting, b.lighting);
            return Err(CompareError::LightingMismatch {
                first: a.lighting.to_string(),
                second: b.lighting.to_string(),
            });
        }

        let threshold = self.gates.min_comparison_quality;
        for (slot, image) in [(1, a), (2, b)] {
            if image.quality_score < threshold {
                info!(
                    "❌ Image {} quality {:.3} insufficient for comparison",
                    slot, image.quality_score
                );
                return Err(CompareError::InsufficientQuality {
                    image: slot,
                    score: image.quality_score,
                    threshold,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfidenceLevel;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    const FRONT_DAY: CaptureLabels = CaptureLabels::new(VehicleView::Front, LightingType::Daylight);
    const REAR_DAY: CaptureLabels = CaptureLabels::new(VehicleView::Rear, LightingType::Daylight);
    const FRONT_IR: CaptureLabels = CaptureLabels::new(VehicleView::Front, LightingType::Infrared);

    fn fill(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, v: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([v]));
            }
        }
    }

    fn fill_rgb(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, c: [u8; 3]) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Rgb(c));
            }
        }
    }

    /// Two headlights, four grille bars and vertical ribs in the lower
    /// third (textured without adding horizontal edges).
    fn front_scene() -> GrayImage {
        let mut img = GrayImage::from_pixel(640, 480, Luma([100]));
        fill(&mut img, 100, 80, 100, 40, 250);
        fill(&mut img, 440, 80, 100, 40, 250);
        for y in [140, 165, 190, 215] {
            fill(&mut img, 220, y, 200, 8, 25);
        }
        for x in (0..640).step_by(24) {
            fill(&mut img, x, 330, 12, 150, 50);
        }
        img
    }

    fn front_scene_rgb() -> RgbImage {
        let mut img = RgbImage::from_pixel(640, 480, Rgb([80, 110, 180]));
        fill_rgb(&mut img, 100, 80, 100, 40, [250, 250, 250]);
        fill_rgb(&mut img, 440, 80, 100, 40, [250, 250, 250]);
        for y in [140, 165, 190, 215] {
            fill_rgb(&mut img, 220, y, 200, 8, [25, 25, 25]);
        }
        for x in (0..640).step_by(24) {
            fill_rgb(&mut img, x, 330, 12, 150, [50, 50, 50]);
        }
        img
    }

    fn rear_scene_rgb() -> RgbImage {
        let mut img = RgbImage::from_pixel(640, 480, Rgb([80, 110, 180]));
        fill_rgb(&mut img, 80, 250, 60, 40, [210, 25, 20]);
        fill_rgb(&mut img, 500, 250, 60, 40, [210, 25, 20]);
        img
    }

    /// Plate with four dark glyphs, kept below the daylight lamp threshold.
    fn paint_plate(img: &mut RgbImage) {
        fill_rgb(img, 260, 360, 120, 40, [170, 170, 170]);
        for x in [272, 296, 320, 344] {
            fill_rgb(img, x, 368, 10, 24, [20, 20, 20]);
        }
    }

    /// A green vehicle with unlit amber lamps in the top corners, a plain
    /// nose and slats along the bottom edge. Nothing crosses the lamp
    /// thresholds and the grille window stays flat.
    fn other_vehicle_rgb() -> RgbImage {
        let mut img = RgbImage::from_pixel(640, 480, Rgb([40, 90, 50]));
        fill_rgb(&mut img, 20, 20, 140, 20, [220, 140, 30]);
        fill_rgb(&mut img, 480, 20, 140, 20, [220, 140, 30]);
        for y in (420..480).step_by(12) {
            fill_rgb(&mut img, 0, y, 640, 6, [20, 20, 20]);
        }
        img
    }

    /// Infrared frame with a retroreflective plate. `dark_surround` adds
    /// two dark panels beside the plate, as if the plate were moved onto
    /// another vehicle.
    fn ir_scene(dark_surround: bool) -> GrayImage {
        let mut img = GrayImage::from_pixel(640, 480, Luma([100]));
        fill(&mut img, 100, 80, 100, 40, 250);
        fill(&mut img, 440, 80, 100, 40, 250);
        for y in [140, 165, 190, 215] {
            fill(&mut img, 220, y, 200, 8, 25);
        }
        if dark_surround {
            fill(&mut img, 180, 335, 60, 90, 30);
            fill(&mut img, 400, 335, 60, 90, 30);
        }
        fill(&mut img, 260, 360, 120, 40, 235);
        img
    }

    #[test]
    fn test_identical_images_are_same_vehicle() {
        let service = VehicleComparisonService::default();
        let raster = Raster::from_gray(front_scene());
        let result = service
            .compare_declared(&raster, FRONT_DAY, &raster, FRONT_DAY)
            .unwrap();

        assert!(result.is_same_vehicle);
        assert!(result.similarity_score >= 0.95, "similarity {}", result.similarity_score);
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
        assert!(result.detailed_scores.geometric_similarity > 0.99);
        assert!(result.detailed_scores.light_pattern_similarity > 0.99);
        assert!(result.detailed_scores.color_similarity.is_some());
        assert!(result.detailed_scores.thermal_similarity.is_none());
        assert!(result.processing_info.view_consistency);
        assert!(result.processing_info.lighting_consistency);
        assert!(result.processing_info.image1_quality >= 0.5);
        assert_eq!(
            result.processing_info.image1_quality,
            result.processing_info.image2_quality
        );
    }

    #[test]
    fn test_declared_view_mismatch_is_rejected() {
        let service = VehicleComparisonService::default();
        let raster = Raster::from_gray(front_scene());
        let err = service
            .compare_declared(&raster, FRONT_DAY, &raster, REAR_DAY)
            .unwrap_err();
        assert_eq!(
            err,
            CompareError::ViewMismatch {
                first: "front".into(),
                second: "rear".into(),
            }
        );
        assert!(err.is_rejection());
    }

    #[test]
    fn test_declared_lighting_mismatch_is_rejected() {
        let service = VehicleComparisonService::default();
        let raster = Raster::from_gray(front_scene());
        let err = service
            .compare_declared(&raster, FRONT_DAY, &raster, FRONT_IR)
            .unwrap_err();
        assert!(matches!(err, CompareError::LightingMismatch { .. }));
    }

    #[test]
    fn test_low_quality_image_is_rejected_with_threshold() {
        let service = VehicleComparisonService::default();
        let good = Raster::from_gray(front_scene());
        let poor = Raster::from_gray(GrayImage::from_pixel(64, 48, Luma([128])));

        let err = service.compare(&poor, &good).unwrap_err();
        match err {
            CompareError::QualityTooLow {
                image,
                score,
                threshold,
            } => {
                assert_eq!(image, 1);
                assert!(score < 0.3);
                assert_eq!(threshold, 0.3);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(service
            .compare_declared(&good, FRONT_DAY, &poor, FRONT_DAY)
            .unwrap_err()
            .to_string()
            .contains("0.30"));
    }

    #[test]
    fn test_moved_plate_lowers_thermal_similarity() {
        let service = VehicleComparisonService::default();
        let original = Raster::from_gray(ir_scene(false));
        let swapped = Raster::from_gray(ir_scene(true));

        let same = service
            .compare_declared(&original, FRONT_IR, &original, FRONT_IR)
            .unwrap();
        let same_thermal = same.detailed_scores.thermal_similarity.unwrap();
        assert!(same_thermal > 0.99);
        assert!(same.detailed_scores.color_similarity.is_none());

        let moved = service
            .compare_declared(&original, FRONT_IR, &swapped, FRONT_IR)
            .unwrap();
        let moved_thermal = moved.detailed_scores.thermal_similarity.unwrap();
        assert!(moved_thermal < 0.9, "thermal {}", moved_thermal);
        assert!(moved.similarity_score < same.similarity_score);
    }

    #[test]
    fn test_shared_plate_on_other_vehicle_is_not_same_vehicle() {
        let service = VehicleComparisonService::default();
        let mut first = front_scene_rgb();
        paint_plate(&mut first);
        let mut second = other_vehicle_rgb();
        paint_plate(&mut second);
        let (first, second) = (Raster::from_rgb(first), Raster::from_rgb(second));

        let same = service
            .compare_declared(&first, FRONT_DAY, &first, FRONT_DAY)
            .unwrap();
        assert!(same.is_same_vehicle);

        let result = service
            .compare_declared(&first, FRONT_DAY, &second, FRONT_DAY)
            .unwrap();
        assert!(!result.is_same_vehicle, "similarity {}", result.similarity_score);
        assert!(result.similarity_score < 0.75, "similarity {}", result.similarity_score);
        assert_ne!(result.confidence_level, ConfidenceLevel::High);
        assert!(result.detailed_scores.light_pattern_similarity < 0.2);
        assert!(
            result.detailed_scores.geometric_similarity
                < same.detailed_scores.geometric_similarity
        );
        assert!(result.processing_info.image2_quality >= 0.5);
    }

    #[test]
    fn test_classified_pair_runs_end_to_end() {
        let service = VehicleComparisonService::default();
        let raster = Raster::from_rgb(front_scene_rgb());
        let result = service.compare(&raster, &raster).unwrap();
        assert!(result.is_same_vehicle);
        assert!(result.detailed_scores.color_similarity.is_some());
    }

    #[test]
    fn test_classified_front_and_rear_do_not_compare() {
        let service = VehicleComparisonService::default();
        let front = Raster::from_rgb(front_scene_rgb());
        let rear = Raster::from_rgb(rear_scene_rgb());
        let err = service.compare(&front, &rear).unwrap_err();
        assert_eq!(
            err,
            CompareError::ViewMismatch {
                first: "front".into(),
                second: "rear".into(),
            }
        );
    }

    #[test]
    fn test_unknown_declared_label_is_rejected() {
        let service = VehicleComparisonService::default();
        let raster = Raster::from_gray(front_scene());
        let unknown = CaptureLabels::new(VehicleView::Unknown, LightingType::Daylight);
        let err = service
            .compare_declared(&raster, unknown, &raster, FRONT_DAY)
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::LowClassificationConfidence {
                image: 1,
                aspect: "view",
                ..
            }
        ));
    }

    #[test]
    fn test_insufficient_quality_after_classification() {
        let config = EngineConfig {
            gates: GateConfig {
                min_comparison_quality: 0.99,
                ..GateConfig::default()
            },
            ..EngineConfig::default()
        };
        let service = VehicleComparisonService::new(config);
        let raster = Raster::from_gray(front_scene());
        let err = service
            .compare_declared(&raster, FRONT_DAY, &raster, FRONT_DAY)
            .unwrap_err();
        assert!(matches!(err, CompareError::InsufficientQuality { image: 1, .. }));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let service = VehicleComparisonService::default();
        let a = Raster::from_gray(ir_scene(false));
        let b = Raster::from_gray(ir_scene(true));
        let mut first = service.compare_declared(&a, FRONT_IR, &b, FRONT_IR).unwrap();
        let mut second = service.compare_declared(&a, FRONT_IR, &b, FRONT_IR).unwrap();
        first.processing_info.processing_time_ms = 0;
        second.processing_info.processing_time_ms = 0;
        assert_eq!(first, second);
    }
}
