// src/extraction/lights.rs
//
// Headlight / taillight pattern extraction.
//
// Region finding depends on view and lighting:
//   - front:            bright regions (200 for IR, 180 otherwise), opened 5×5
//   - rear, daylight:   red hue mask (both hue ranges), bright regions for
//                       single-channel input
//   - rear, infrared:   bright regions
//
// Signature layout (10 slots, zero padded):
//   [0, n)   size + intensity + shape code per element
//   n        mean intensity
//   n + 1    left/right symmetry (only when n ≥ 2)

use super::{FeatureBlock, FeatureExtractor};
use crate::color_analysis::{red_mask, RedHue};
use crate::error::Result;
use crate::raster::Raster;
use crate::types::{
    LightConfiguration, LightElement, LightPatternFeatures, LightShape, LightType, LightingType,
    VehicleImage, VehicleView, PATTERN_SIGNATURE_LEN,
};
use crate::vision::{external_regions, stats, threshold, Region};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct LightPatternConfig {
    pub infrared_threshold: u8,
    pub daylight_threshold: u8,
    /// Radius of the square opening applied to brightness masks.
    pub open_radius: u8,
    /// Exclusive bounding-box area bounds for front regions.
    pub front_area: (i64, i64),
    /// Exclusive bounding-box area bounds for rear regions.
    pub rear_area: (i64, i64),
    /// Exclusive aspect bounds for red regions.
    pub red_aspect: (f64, f64),
    /// Exclusive (min, max) width and height of headlight candidates.
    pub headlight_width: (i32, i32),
    pub headlight_height: (i32, i32),
    pub taillight_width: (i32, i32),
    pub taillight_height: (i32, i32),
    pub round_circularity: f64,
    pub wide_aspect: f64,
    pub tall_aspect: f64,
}

impl Default for LightPatternConfig {
    fn default() -> Self {
        Self {
            infrared_threshold: 200,
            daylight_threshold: 180,
            open_radius: 2,
            front_area: (100, 10_000),
            rear_area: (200, 8_000),
            red_aspect: (0.3, 3.0),
            headlight_width: (20, 200),
            headlight_height: (15, 150),
            taillight_width: (15, 150),
            taillight_height: (20, 200),
            round_circularity: 0.7,
            wide_aspect: 1.5,
            tall_aspect: 0.7,
        }
    }
}

const NEUTRAL_SYMMETRY: f64 = 0.5;

// ============================================================================
// EXTRACTOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LightPatternExtractor {
    config: LightPatternConfig,
}

impl LightPatternExtractor {
    pub fn new(config: LightPatternConfig) -> Self {
        Self { config }
    }

    pub fn extract_patterns(
        &self,
        raster: &Raster,
        view: VehicleView,
        lighting: LightingType,
    ) -> LightPatternFeatures {
        let gray = raster.to_gray();
        let (regions, kind) = match view {
            VehicleView::Front => {
                let found = self.bright_regions(&gray, lighting, self.config.front_area);
                (self.filter_headlights(found), LightType::Headlight)
            }
            VehicleView::Rear => {
                let found = self.taillight_regions(raster, &gray, lighting);
                (self.filter_taillights(found), LightType::Taillight)
            }
            VehicleView::Unknown => return LightPatternFeatures::default(),
        };

        let light_elements: Vec<LightElement> = regions
            .iter()
            .map(|r| self.analyze(&gray, r, kind))
            .collect();
        let pattern_signature = pattern_signature(&light_elements);
        let light_configuration = light_configuration(&light_elements);

        debug!(
            "💡 {} light element(s), symmetry {:.2}, spacing {:.1}",
            light_elements.len(),
            light_configuration.symmetry,
            light_configuration.spacing
        );

        LightPatternFeatures {
            light_elements,
            pattern_signature,
            light_configuration,
        }
    }

    fn bright_regions(&self, gray: &GrayImage, lighting: LightingType, area: (i64, i64)) -> Vec<Region> {
        let t = if lighting == LightingType::Infrared {
            self.config.infrared_threshold
        } else {
            self.config.daylight_threshold
        };
        let mask = threshold::open_square(&threshold::above(gray, t), self.config.open_radius);
        external_regions(&mask)
            .into_iter()
            .filter(|r| {
                let a = r.bounds.area();
                a > area.0 && a < area.1
            })
            .collect()
    }

    fn taillight_regions(&self, raster: &Raster, gray: &GrayImage, lighting: LightingType) -> Vec<Region> {
        if lighting != LightingType::Daylight {
            return self.bright_regions(gray, lighting, self.config.rear_area);
        }
        let Some(rgb) = raster.to_rgb() else {
            return self.bright_regions(gray, lighting, self.config.rear_area);
        };
        let (lo, hi) = self.config.rear_area;
        let (alo, ahi) = self.config.red_aspect;
        external_regions(&red_mask(&rgb, RedHue::Wrapped))
            .into_iter()
            .filter(|r| {
                let a = r.bounds.area();
                let aspect = r.aspect_ratio();
                a > lo && a < hi && aspect > alo && aspect < ahi
            })
            .collect()
    }

    fn filter_headlights(&self, regions: Vec<Region>) -> Vec<Region> {
        let (w, h) = (self.config.headlight_width, self.config.headlight_height);
        regions
            .into_iter()
            .filter(|r| within(r.bounds.width, w) && within(r.bounds.height, h))
            .collect()
    }

    fn filter_taillights(&self, regions: Vec<Region>) -> Vec<Region> {
        let (w, h) = (self.config.taillight_width, self.config.taillight_height);
        regions
            .into_iter()
            .filter(|r| within(r.bounds.width, w) && within(r.bounds.height, h))
            .collect()
    }

    fn analyze(&self, gray: &GrayImage, region: &Region, kind: LightType) -> LightElement {
        LightElement {
            position: region.center(),
            shape: self.classify_shape(region),
            size: region.box_area(),
            intensity: stats::region_mean(gray, &region.bounds) / 255.0,
            kind,
        }
    }

    fn classify_shape(&self, region: &Region) -> LightShape {
        let aspect = region.aspect_ratio();
        if aspect > self.config.wide_aspect || aspect < self.config.tall_aspect {
            return LightShape::Rectangular;
        }
        if region.perimeter <= 0.0 {
            return LightShape::Custom;
        }
        if region.circularity() > self.config.round_circularity {
            LightShape::Round
        } else {
            LightShape::Angular
        }
    }
}

impl FeatureExtractor for LightPatternExtractor {
    fn name(&self) -> &'static str {
        "light_pattern"
    }

    fn extract(&self, image: &VehicleImage) -> Result<FeatureBlock> {
        Ok(FeatureBlock::LightPattern(self.extract_patterns(
            &image.raster,
            image.view,
            image.lighting,
        )))
    }
}

#[inline]
fn within(v: i32, (lo, hi): (i32, i32)) -> bool {
    v > lo && v < hi
}

// ============================================================================
// SIGNATURE & CONFIGURATION
// ============================================================================

pub fn pattern_signature(elements: &[LightElement]) -> [f64; PATTERN_SIGNATURE_LEN] {
    let mut signature = [0.0; PATTERN_SIGNATURE_LEN];
    for (slot, e) in signature.iter_mut().zip(elements) {
        *slot = e.size + e.intensity + e.shape.code();
    }

    let n = elements.len();
    if n == 0 {
        return signature;
    }
    if n < PATTERN_SIGNATURE_LEN {
        signature[n] = elements.iter().map(|e| e.intensity).sum::<f64>() / n as f64;
    }
    if n >= 2 && n + 1 < PATTERN_SIGNATURE_LEN {
        signature[n + 1] = symmetry(elements);
    }
    signature
}

pub fn light_configuration(elements: &[LightElement]) -> LightConfiguration {
    let n = elements.len();
    if n < 2 {
        return LightConfiguration {
            num_elements: n,
            symmetry: NEUTRAL_SYMMETRY,
            spacing: 0.0,
        };
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..n {
        for j in i + 1..n {
            total += elements[i].position.distance(&elements[j].position);
            pairs += 1;
        }
    }

    LightConfiguration {
        num_elements: n,
        symmetry: symmetry(elements),
        spacing: total / pairs as f64,
    }
}

/// 1 − |left − right| / n, split at the mean x.
fn symmetry(elements: &[LightElement]) -> f64 {
    let n = elements.len() as f64;
    let center_x = elements.iter().map(|e| e.position.x).sum::<f64>() / n;
    let left = elements.iter().filter(|e| e.position.x < center_x).count() as f64;
    let right = n - left;
    1.0 - (left - right).abs() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2D;
    use approx::assert_abs_diff_eq;
    use image::{Luma, Rgb, RgbImage};

    fn element(x: f64, size: f64, intensity: f64, shape: LightShape) -> LightElement {
        LightElement {
            position: Point2D::new(x, 50.0),
            shape,
            size,
            intensity,
            kind: LightType::Headlight,
        }
    }

    #[test]
    fn test_signature_fill_order() {
        let elements = vec![
            element(10.0, 100.0, 0.5, LightShape::Round),
            element(90.0, 200.0, 0.7, LightShape::Angular),
        ];
        let sig = pattern_signature(&elements);
        assert_abs_diff_eq!(sig[0], 101.5, epsilon = 1e-9);
        assert_abs_diff_eq!(sig[1], 202.7, epsilon = 1e-9);
        assert_abs_diff_eq!(sig[2], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(sig[3], 1.0);
        assert!(sig[4..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_element_has_no_symmetry_slot() {
        let sig = pattern_signature(&[element(10.0, 50.0, 0.4, LightShape::Rectangular)]);
        assert_abs_diff_eq!(sig[0], 50.4, epsilon = 1e-9);
        assert_abs_diff_eq!(sig[1], 0.4, epsilon = 1e-12);
        assert_eq!(sig[2], 0.0);
        let cfg = light_configuration(&[element(10.0, 50.0, 0.4, LightShape::Rectangular)]);
        assert_eq!(cfg.num_elements, 1);
        assert_eq!(cfg.symmetry, 0.5);
        assert_eq!(cfg.spacing, 0.0);
    }

    #[test]
    fn test_full_signature_has_no_pattern_slots() {
        let elements: Vec<_> = (0..10)
            .map(|i| element(i as f64 * 10.0, 1.0, 0.0, LightShape::Rectangular))
            .collect();
        let sig = pattern_signature(&elements);
        assert!(sig.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_configuration_spacing_and_symmetry() {
        let elements = vec![
            element(0.0, 1.0, 1.0, LightShape::Round),
            element(30.0, 1.0, 1.0, LightShape::Round),
            element(40.0, 1.0, 1.0, LightShape::Round),
        ];
        let cfg = light_configuration(&elements);
        // Mean x = 23.3: one left, two right.
        assert_abs_diff_eq!(cfg.symmetry, 1.0 - 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cfg.spacing, (30.0 + 40.0 + 10.0) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_front_headlights_extracted() {
        let mut img = GrayImage::from_pixel(320, 240, Luma([50]));
        for x0 in [40u32, 240] {
            for y in 60..90 {
                for x in x0..x0 + 40 {
                    img.put_pixel(x, y, Luma([230]));
                }
            }
        }
        let f = LightPatternExtractor::default().extract_patterns(
            &Raster::from_gray(img),
            VehicleView::Front,
            LightingType::Daylight,
        );
        assert_eq!(f.light_elements.len(), 2);
        let e = f.light_elements[0];
        assert_eq!(e.kind, LightType::Headlight);
        assert_eq!(e.size, 1200.0);
        assert_abs_diff_eq!(e.intensity, 230.0 / 255.0, epsilon = 1e-12);
        // A 4:3 box is compact enough to read as round.
        assert_eq!(e.shape, LightShape::Round);
        assert_eq!(f.light_configuration.num_elements, 2);
        assert_abs_diff_eq!(f.light_configuration.spacing, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rear_daylight_uses_red_mask() {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([200, 200, 200]));
        for x0 in [30u32, 260] {
            for y in 100..140 {
                for x in x0..x0 + 25 {
                    img.put_pixel(x, y, Rgb([200, 20, 30]));
                }
            }
        }
        let f = LightPatternExtractor::default().extract_patterns(
            &Raster::from_rgb(img),
            VehicleView::Rear,
            LightingType::Daylight,
        );
        // The light gray body is brighter than 180 but not red.
        assert_eq!(f.light_elements.len(), 2);
        assert!(f.light_elements.iter().all(|e| e.kind == LightType::Taillight));
        assert_eq!(f.light_elements[0].shape, LightShape::Rectangular);
    }

    #[test]
    fn test_unknown_view_yields_default() {
        let img = GrayImage::from_pixel(50, 50, Luma([250]));
        let f = LightPatternExtractor::default().extract_patterns(
            &Raster::from_gray(img),
            VehicleView::Unknown,
            LightingType::Infrared,
        );
        assert!(f.light_elements.is_empty());
        assert_eq!(f.light_configuration.symmetry, 0.5);
    }
}
