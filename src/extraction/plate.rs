// src/extraction/plate.rs
//
// License plate localization. Always returns a region, degrading through
// three tiers:
//   1. best-scoring plate-shaped contour of (adaptive ∪ bright) mask
//   2. brightest 3:1 window slid over the lower two thirds
//   3. fixed bottom-center box with confidence 0.1

use crate::types::{Bounds, LicensePlateRegion};
use crate::vision::{external_regions, threshold, IntegralImage, Region};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PlateDetectorConfig {
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Aspect ratio scored as ideal.
    pub ideal_aspect: f64,
    pub bright_threshold: u8,
    pub adaptive_block: u32,
    pub adaptive_offset: f64,
    /// Average brightness above which the plate counts as retroreflective.
    pub reflective_brightness: f64,
    pub window_step: i32,
    pub window_width_step: i32,
}

impl Default for PlateDetectorConfig {
    fn default() -> Self {
        Self {
            min_width: 80,
            max_width: 400,
            min_height: 20,
            max_height: 120,
            min_aspect: 2.0,
            max_aspect: 4.5,
            ideal_aspect: 3.0,
            bright_threshold: 200,
            adaptive_block: 15,
            adaptive_offset: -2.0,
            reflective_brightness: 180.0,
            window_step: 10,
            window_width_step: 20,
        }
    }
}

const FALLBACK_CONFIDENCE: f64 = 0.1;
const FALLBACK_BOTTOM_MARGIN: i32 = 20;

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PlateDetector {
    config: PlateDetectorConfig,
}

impl PlateDetector {
    pub fn new(config: PlateDetectorConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, gray: &GrayImage) -> LicensePlateRegion {
        let integral = IntegralImage::new(gray);

        if let Some(plate) = self.best_contour(gray, &integral) {
            debug!(
                "Plate from contour at ({}, {}) {}x{}, confidence {:.2}",
                plate.bounds.x, plate.bounds.y, plate.bounds.width, plate.bounds.height, plate.confidence
            );
            return plate;
        }
        if let Some(plate) = self.brightest_window(gray, &integral) {
            debug!("Plate from sliding window, brightness {:.1}", plate.avg_brightness);
            return plate;
        }
        debug!("Plate detection fell back to fixed region");
        self.fixed_region(gray)
    }

    fn best_contour(&self, gray: &GrayImage, integral: &IntegralImage) -> Option<LicensePlateRegion> {
        let c = &self.config;
        let adaptive = threshold::adaptive_mean(gray, c.adaptive_block, c.adaptive_offset);
        let bright = threshold::above(gray, c.bright_threshold);
        let combined = threshold::union(&adaptive, &bright);

        let mut best: Option<LicensePlateRegion> = None;
        let mut best_score = 0.0;
        for region in external_regions(&combined) {
            if !self.is_plate_sized(&region.bounds) {
                continue;
            }
            let brightness = integral.mean(&region.bounds);
            let score = self.score(gray.height(), &region, brightness);
            if score > best_score {
                best_score = score;
                best = Some(LicensePlateRegion {
                    bounds: region.bounds,
                    confidence: score,
                    avg_brightness: brightness,
                    is_reflective: brightness > c.reflective_brightness,
                });
            }
        }
        best
    }

    fn is_plate_sized(&self, b: &Bounds) -> bool {
        let c = &self.config;
        if b.width < c.min_width || b.width > c.max_width {
            return false;
        }
        if b.height < c.min_height || b.height > c.max_height {
            return false;
        }
        let aspect = b.aspect_ratio();
        aspect >= c.min_aspect && aspect <= c.max_aspect
    }

    fn score(&self, rows: u32, region: &Region, brightness: f64) -> f64 {
        let b = &region.bounds;
        let brightness_score = (brightness / 255.0).min(1.0);
        let rectangularity = region.area / b.area().max(1) as f64;
        let ideal = self.config.ideal_aspect;
        let ratio_score = 1.0 - (b.aspect_ratio() - ideal).abs() / ideal;
        // Plates rarely sit in the upper third.
        let position_score = if b.y < (rows / 3) as i32 { 0.5 } else { 1.0 };

        let score =
            0.4 * brightness_score + 0.3 * rectangularity + 0.2 * ratio_score + 0.1 * position_score;
        score.clamp(0.0, 1.0)
    }

    fn brightest_window(&self, gray: &GrayImage, integral: &IntegralImage) -> Option<LicensePlateRegion> {
        let c = &self.config;
        let (cols, rows) = (gray.width() as i32, gray.height() as i32);

        let mut best: Option<LicensePlateRegion> = None;
        let mut max_brightness = 0.0;
        let mut y = rows / 3;
        while y < rows - c.min_height {
            let mut x = 0;
            while x < cols - c.min_width {
                let mut width = c.min_width;
                while width <= c.max_width && x + width < cols {
                    let height = width / 3;
                    if height >= c.min_height && height <= c.max_height && y + height < rows {
                        let bounds = Bounds::new(x, y, width, height);
                        let brightness = integral.mean(&bounds);
                        if brightness > max_brightness {
                            max_brightness = brightness;
                            best = Some(LicensePlateRegion {
                                bounds,
                                confidence: brightness / 255.0,
                                avg_brightness: brightness,
                                is_reflective: brightness > c.reflective_brightness,
                            });
                        }
                    }
                    width += c.window_width_step;
                }
                x += c.window_step;
            }
            y += c.window_step;
        }
        best
    }

    fn fixed_region(&self, gray: &GrayImage) -> LicensePlateRegion {
        let (cols, rows) = (gray.width() as i32, gray.height() as i32);
        let width = self.config.min_width * 2;
        let height = width / 3;
        LicensePlateRegion {
            bounds: Bounds::new(
                (cols - width) / 2,
                rows - height - FALLBACK_BOTTOM_MARGIN,
                width,
                height,
            ),
            confidence: FALLBACK_CONFIDENCE,
            avg_brightness: 0.0,
            is_reflective: false,
        }
    }
}

pub fn detect_plate(gray: &GrayImage) -> LicensePlateRegion {
    PlateDetector::default().detect(gray)
}
