// src/preprocessing/classifier.rs
//
// Rule-based view (front / rear) and lighting (daylight / infrared)
// classification. Each heuristic returns a fixed tier score; the view is
// whichever side accumulates strictly more.

use crate::color_analysis::{mean_saturation, red_mask, RedHue};
use crate::raster::Raster;
use crate::types::{Bounds, LightingType, VehicleView};
use crate::vision::{external_regions, horizontal_segments, stats, threshold, DEFAULT_MAX_GAP};
use image::GrayImage;
use serde::Serialize;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

const HEADLIGHT_THRESHOLD: u8 = 200;
const HEADLIGHT_AREA: (f64, f64) = (100.0, 5000.0);

const GRILLE_MIN_VOTES: usize = 30;
const GRILLE_MAX_DY: i32 = 10;
const GRILLE_MIN_DX: i32 = 30;

const TAILLIGHT_RED_AREA: (f64, f64) = (200.0, 8000.0);
const TAILLIGHT_BRIGHT_THRESHOLD: u8 = 180;
const TAILLIGHT_BRIGHT_BOX_AREA: (i64, i64) = (300, 10_000);
const TAILLIGHT_MAX_ASPECT: f64 = 1.5;

const BUMPER_MIN_VOTES: usize = 30;
const BUMPER_MAX_DY: i32 = 15;
const BUMPER_MIN_DX: i32 = 25;

const DAYLIGHT_MIN_SATURATION: f64 = 0.1;
const DAYLIGHT_MIN_BRIGHTNESS: f64 = 0.3;
const INFRARED_MIN_CONTRAST: f64 = 0.7;
const INFRARED_MAX_SATURATION: f64 = 0.05;
const LIGHTING_CONFIDENCE: f64 = 0.8;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewClassification {
    pub view: VehicleView,
    pub confidence: f64,
    pub front_score: f64,
    pub rear_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightingClassification {
    pub lighting: LightingType,
    pub confidence: f64,
    pub brightness: f64,
    pub contrast_pattern: f64,
    pub saturation: f64,
}

// ============================================================================
// VIEW
// ============================================================================

pub fn classify_view(raster: &Raster) -> ViewClassification {
    let gray = raster.to_gray();
    let front_score = headlight_score(&gray) + grille_score(&gray);
    let rear_score = taillight_score(raster, &gray) + rear_bumper_score(&gray);

    let view = if front_score > rear_score {
        VehicleView::Front
    } else if rear_score > front_score {
        VehicleView::Rear
    } else {
        VehicleView::Unknown
    };
    let confidence = if view == VehicleView::Unknown {
        0.0
    } else {
        (front_score - rear_score).abs().min(1.0)
    };

    debug!(
        "View scores: front={:.2} rear={:.2} → {} ({:.2})",
        front_score, rear_score, view, confidence
    );

    ViewClassification {
        view,
        confidence,
        front_score,
        rear_score,
    }
}

fn headlight_score(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    let upper = threshold::crop(gray, &Bounds::new(0, 0, w as i32, (h / 2) as i32));
    let mask = threshold::above(&upper, HEADLIGHT_THRESHOLD);
    let count = external_regions(&mask)
        .iter()
        .filter(|r| r.area > HEADLIGHT_AREA.0 && r.area < HEADLIGHT_AREA.1)
        .count();
    match count {
        2..=4 => 0.7,
        1 => 0.3,
        _ => 0.1,
    }
}

fn grille_score(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as i32, h as i32);
    let center = Bounds::new(w / 4, h / 4, 3 * w / 4 - w / 4, 3 * h / 4 - h / 4);
    let edges = stats::edges(&threshold::crop(gray, &center));
    let lines = horizontal_segments(&edges, GRILLE_MIN_VOTES, DEFAULT_MAX_GAP)
        .iter()
        .filter(|s| s.dy() < GRILLE_MAX_DY && s.dx() > GRILLE_MIN_DX)
        .count();
    if lines > 3 {
        0.6
    } else if lines > 1 {
        0.3
    } else {
        0.1
    }
}

fn taillight_score(raster: &Raster, gray: &GrayImage) -> f64 {
    match raster.to_rgb() {
        Some(rgb) => {
            let mask = red_mask(&rgb, RedHue::Low);
            let count = external_regions(&mask)
                .iter()
                .filter(|r| r.area > TAILLIGHT_RED_AREA.0 && r.area < TAILLIGHT_RED_AREA.1)
                .count();
            match count {
                0 => 0.1,
                1 => 0.4,
                _ => 0.8,
            }
        }
        None => {
            let mask = threshold::above(gray, TAILLIGHT_BRIGHT_THRESHOLD);
            let count = external_regions(&mask)
                .iter()
                .filter(|r| {
                    let area = r.bounds.area();
                    r.aspect_ratio() < TAILLIGHT_MAX_ASPECT
                        && area > TAILLIGHT_BRIGHT_BOX_AREA.0
                        && area < TAILLIGHT_BRIGHT_BOX_AREA.1
                })
                .count();
            match count {
                0 => 0.1,
                1 => 0.3,
                _ => 0.6,
            }
        }
    }
}

fn rear_bumper_score(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    let lower = Bounds::new(0, (h / 2) as i32, w as i32, (h - h / 2) as i32);
    let edges = stats::edges(&threshold::crop(gray, &lower));
    let lines = horizontal_segments(&edges, BUMPER_MIN_VOTES, DEFAULT_MAX_GAP)
        .iter()
        .filter(|s| s.dy() < BUMPER_MAX_DY && s.dx() > BUMPER_MIN_DX)
        .count();
    if lines > 2 {
        0.5
    } else if lines > 0 {
        0.3
    } else {
        0.1
    }
}

// ============================================================================
// LIGHTING
// ============================================================================

pub fn classify_lighting(raster: &Raster) -> LightingClassification {
    let gray = raster.to_gray();
    let brightness = stats::mean(&gray) / 255.0;
    let (_, lap_std) = stats::laplacian_stats(&gray);
    let contrast_pattern = lap_std / 100.0;
    let saturation = mean_saturation(raster);

    let (lighting, confidence) =
        if saturation > DAYLIGHT_MIN_SATURATION && brightness > DAYLIGHT_MIN_BRIGHTNESS {
            (LightingType::Daylight, LIGHTING_CONFIDENCE)
        } else if contrast_pattern > INFRARED_MIN_CONTRAST && saturation < INFRARED_MAX_SATURATION {
            (LightingType::Infrared, LIGHTING_CONFIDENCE)
        } else {
            (LightingType::Unknown, 0.0)
        };

    debug!(
        "Lighting: brightness={:.2} contrast={:.2} saturation={:.2} → {}",
        brightness, contrast_pattern, saturation, lighting
    );

    LightingClassification {
        lighting,
        confidence,
        brightness,
        contrast_pattern,
        saturation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn paint(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, v: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([v]));
            }
        }
    }

    #[test]
    fn test_two_upper_lamps_read_as_front() {
        let mut img = GrayImage::from_pixel(320, 240, Luma([60]));
        paint(&mut img, 40, 40, 40, 20, 240);
        paint(&mut img, 240, 40, 40, 20, 240);
        let c = classify_view(&Raster::from_gray(img));
        assert_eq!(c.view, VehicleView::Front);
        assert!(c.confidence > 0.0);
    }

    #[test]
    fn test_featureless_image_is_unknown_view() {
        let img = GrayImage::from_pixel(200, 200, Luma([90]));
        let c = classify_view(&Raster::from_gray(img));
        // 0.1 + 0.1 on each side.
        assert_eq!(c.view, VehicleView::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_red_lamps_read_as_rear() {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([70, 70, 75]));
        for (x0, y0) in [(30u32, 120u32), (250, 120)] {
            for y in y0..y0 + 40 {
                for x in x0..x0 + 30 {
                    img.put_pixel(x, y, Rgb([210, 25, 20]));
                }
            }
        }
        let c = classify_view(&Raster::from_rgb(img));
        assert_eq!(c.view, VehicleView::Rear);
    }

    #[test]
    fn test_saturated_bright_image_is_daylight() {
        let img = RgbImage::from_pixel(50, 50, Rgb([200, 120, 60]));
        let c = classify_lighting(&Raster::from_rgb(img));
        assert_eq!(c.lighting, LightingType::Daylight);
        assert_eq!(c.confidence, 0.8);
    }

    #[test]
    fn test_gray_high_contrast_is_infrared() {
        let img = GrayImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([10])
            } else {
                Luma([240])
            }
        });
        let c = classify_lighting(&Raster::from_gray(img));
        assert_eq!(c.saturation, 0.0);
        assert_eq!(c.lighting, LightingType::Infrared);
    }

    #[test]
    fn test_flat_gray_is_unknown_lighting() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        let c = classify_lighting(&Raster::from_gray(img));
        assert_eq!(c.lighting, LightingType::Unknown);
        assert_eq!(c.confidence, 0.0);
    }
}
