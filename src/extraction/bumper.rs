// src/extraction/bumper.rs
//
// Bumper fingerprint from the lower third of the image: the shape of its
// horizontal edges, surface texture, dark mounting holes / bolts, and
// where the plate sits.

use super::plate::detect_plate;
use super::{FeatureBlock, FeatureExtractor};
use crate::error::Result;
use crate::raster::Raster;
use crate::types::{Bounds, BumperFeatures, Point2D, VehicleImage, BUMPER_TEXTURE_LEN};
use crate::vision::{external_regions, horizontal_segments, stats, threshold, DEFAULT_MAX_GAP};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

const CONTOUR_MIN_VOTES: usize = 20;
const CONTOUR_MIN_LENGTH: i32 = 40;
const CONTOUR_MAX_DY: i32 = 10;
const CONTOUR_SAMPLE_STEP: i32 = 10;
const MAX_CONTOUR_POINTS: usize = 64;

const MOUNTING_THRESHOLD: u8 = 60;
const MOUNTING_AREA: (f64, f64) = (20.0, 400.0);
const MOUNTING_ASPECT: (f64, f64) = (0.5, 2.0);
const MAX_MOUNTING_POINTS: usize = 8;

const TEXTURE_SIGMA: f32 = 1.1;

// ============================================================================
// EXTRACTOR
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct BumperExtractor;

impl FeatureExtractor for BumperExtractor {
    fn name(&self) -> &'static str {
        "bumper"
    }

    fn extract(&self, image: &VehicleImage) -> Result<FeatureBlock> {
        Ok(FeatureBlock::Bumper(extract(&image.raster)))
    }
}

pub fn extract(raster: &Raster) -> BumperFeatures {
    let gray = raster.to_gray();
    let region = lower_third(&gray);
    let lower = threshold::crop(&gray, &region);

    let features = BumperFeatures {
        contour_signature: contour_signature(&lower, region.y),
        texture_features: texture(&lower),
        mounting_points: mounting_points(&lower, region.y),
        license_plate_area: detect_plate(&gray).bounds,
    };
    debug!(
        "Bumper: {} contour point(s), {} mounting point(s)",
        features.contour_signature.len(),
        features.mounting_points.len()
    );
    features
}

fn lower_third(gray: &GrayImage) -> Bounds {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let top = 2 * h / 3;
    Bounds::new(0, top, w, h - top)
}

// ============================================================================
// MEASUREMENTS
// ============================================================================

/// Points every 10 px along each long horizontal edge, in scan order,
/// in image coordinates.
fn contour_signature(lower: &GrayImage, oy: i32) -> Vec<Point2D> {
    let edges = stats::edges(lower);
    let mut points = Vec::new();
    for s in horizontal_segments(&edges, CONTOUR_MIN_VOTES, DEFAULT_MAX_GAP) {
        if s.dx() <= CONTOUR_MIN_LENGTH || s.dy() >= CONTOUR_MAX_DY {
            continue;
        }
        let slope = (s.y2 - s.y1) as f64 / (s.x2 - s.x1) as f64;
        let mut x = s.x1;
        while x <= s.x2 {
            let y = s.y1 as f64 + slope * (x - s.x1) as f64;
            points.push(Point2D::new(x as f64, y + oy as f64));
            if points.len() == MAX_CONTOUR_POINTS {
                return points;
            }
            x += CONTOUR_SAMPLE_STEP;
        }
    }
    points
}

/// Local variance, gradient magnitude and edge density.
fn texture(lower: &GrayImage) -> [f64; BUMPER_TEXTURE_LEN] {
    if lower.as_raw().is_empty() {
        return [0.0; BUMPER_TEXTURE_LEN];
    }
    [
        (stats::gaussian_residual(lower, TEXTURE_SIGMA) / 255.0).min(1.0),
        (stats::sobel_stats(lower).mean_magnitude / 255.0).min(1.0),
        stats::edge_fraction(lower),
    ]
}

/// Compact dark blobs, largest first.
fn mounting_points(lower: &GrayImage, oy: i32) -> Vec<Point2D> {
    let mut blobs: Vec<_> = external_regions(&threshold::below(lower, MOUNTING_THRESHOLD))
        .into_iter()
        .filter(|r| r.area >= MOUNTING_AREA.0 && r.area <= MOUNTING_AREA.1)
        .filter(|r| {
            let aspect = r.aspect_ratio();
            aspect >= MOUNTING_ASPECT.0 && aspect <= MOUNTING_ASPECT.1
        })
        .collect();
    // Stable: equal areas keep scan order.
    blobs.sort_by(|a, b| b.area.total_cmp(&a.area));
    blobs
        .iter()
        .take(MAX_MOUNTING_POINTS)
        .map(|r| {
            let c = r.center();
            Point2D::new(c.x, c.y + oy as f64)
        })
        .collect()
}
