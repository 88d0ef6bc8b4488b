// src/extraction/geometric.rs
//
// View-consistent geometry: proportions, structural landmarks and the
// reference point set used for alignment.
//
// Never fails. Missing signals fall back to neutral values
// (ratio 1.0, plate ratio 0.0, no landmarks) and the reference points
// always end with the four image corners, so point-set comparison never
// sees an empty set.

use super::{FeatureBlock, FeatureExtractor};
use crate::color_analysis::{red_mask, RedHue};
use crate::error::Result;
use crate::raster::Raster;
use crate::types::{
    Bounds, GeometricFeatures, Point2D, StructuralElement, StructuralKind, VehicleImage,
    VehicleProportions, VehicleView,
};
use crate::vision::{external_regions, horizontal_segments, stats, threshold, DEFAULT_MAX_GAP};
use image::GrayImage;
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

const DIVIDER_MIN_VOTES: usize = 50;
const DIVIDER_MAX_DY: i32 = 10;
const DIVIDER_MIN_DX: i32 = 50;

const PLATE_ASPECT: (f64, f64) = (1.5, 2.5); // exclusive
const PLATE_AREA_FRACTION: (f64, f64) = (0.01, 0.15); // exclusive

const HEADLIGHT_THRESHOLD: u8 = 200;
const HEADLIGHT_AREA: (f64, f64) = (100.0, 5000.0);
const GRILLE_MIN_EDGE_PIXELS: usize = 100;

const TAILLIGHT_RED_AREA: (f64, f64) = (200.0, 8000.0);
const TAILLIGHT_BRIGHT_THRESHOLD: u8 = 180;
const TAILLIGHT_BRIGHT_AREA: (f64, f64) = (300.0, 10_000.0);

const BUMPER_MIN_VOTES: usize = 40;
const BUMPER_MAX_DY: i32 = 15;

// ============================================================================
// EXTRACTOR
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricExtractor;

impl FeatureExtractor for GeometricExtractor {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn extract(&self, image: &VehicleImage) -> Result<FeatureBlock> {
        Ok(FeatureBlock::Geometric(extract(&image.raster, image.view)))
    }
}

pub fn extract(raster: &Raster, view: VehicleView) -> GeometricFeatures {
    let gray = raster.to_gray();
    let edges = stats::edges(&gray);

    let vehicle_proportions = VehicleProportions {
        width_height_ratio: raster.width() as f64 / raster.height().max(1) as f64,
        upper_lower_ratio: upper_lower_ratio(&edges),
        license_plate_ratio: plate_ratio(&edges),
    };

    let structural_elements = match view {
        VehicleView::Front => front_elements(&gray),
        VehicleView::Rear => rear_elements(raster, &gray),
        VehicleView::Unknown => Vec::new(),
    };

    // Landmarks first, then the corner anchors.
    let mut reference_points: Vec<Point2D> =
        structural_elements.iter().map(|e| e.position).collect();
    let (w, h) = (raster.width() as f64, raster.height() as f64);
    reference_points.extend([
        Point2D::new(0.0, 0.0),
        Point2D::new(w, 0.0),
        Point2D::new(0.0, h),
        Point2D::new(w, h),
    ]);

    debug!(
        "Geometry: w/h={:.2} upper/lower={:.2} plate={:.3}, {} element(s)",
        vehicle_proportions.width_height_ratio,
        vehicle_proportions.upper_lower_ratio,
        vehicle_proportions.license_plate_ratio,
        structural_elements.len()
    );

    GeometricFeatures {
        vehicle_proportions,
        structural_elements,
        reference_points,
    }
}

// ============================================================================
// PROPORTIONS
// ============================================================================

/// Mode of the midpoints of long near-horizontal segments, expressed as
/// upper height over lower height. Ties resolve to the topmost row.
fn upper_lower_ratio(edges: &GrayImage) -> f64 {
    let mut freq: BTreeMap<i32, usize> = BTreeMap::new();
    for s in horizontal_segments(edges, DIVIDER_MIN_VOTES, DEFAULT_MAX_GAP) {
        if s.dy() < DIVIDER_MAX_DY && s.dx() > DIVIDER_MIN_DX {
            *freq.entry(s.mid_y()).or_insert(0) += 1;
        }
    }

    let mut divider = 0;
    let mut best = 0;
    for (&y, &count) in &freq {
        if count > best {
            best = count;
            divider = y;
        }
    }

    let h = edges.height() as i32;
    if divider <= 0 || divider >= h {
        return 1.0;
    }
    divider as f64 / (h - divider) as f64
}

/// Width fraction of the first plate-shaped edge contour in scan order.
fn plate_ratio(edges: &GrayImage) -> f64 {
    let (w, h) = edges.dimensions();
    let image_area = (w as f64) * (h as f64);
    if image_area == 0.0 {
        return 0.0;
    }
    external_regions(edges)
        .iter()
        .find(|r| {
            let aspect = r.aspect_ratio();
            let fraction = r.box_area() / image_area;
            aspect > PLATE_ASPECT.0
                && aspect < PLATE_ASPECT.1
                && fraction > PLATE_AREA_FRACTION.0
                && fraction < PLATE_AREA_FRACTION.1
        })
        .map(|r| r.bounds.width as f64 / w as f64)
        .unwrap_or(0.0)
}

// ============================================================================
// FRONT LANDMARKS
// ============================================================================

fn front_elements(gray: &GrayImage) -> Vec<StructuralElement> {
    let mut elements: Vec<StructuralElement> = headlights(gray)
        .into_iter()
        .map(|(position, size)| StructuralElement {
            kind: StructuralKind::Headlight,
            position,
            size,
        })
        .collect();
    if let Some((position, size)) = grille_center(gray) {
        elements.push(StructuralElement {
            kind: StructuralKind::Grille,
            position,
            size,
        });
    }
    elements
}

/// Bright blobs in the upper half: (bbox center, contour area).
fn headlights(gray: &GrayImage) -> Vec<(Point2D, f64)> {
    let (w, h) = gray.dimensions();
    let upper = threshold::crop(gray, &Bounds::new(0, 0, w as i32, (h / 2) as i32));
    external_regions(&threshold::above(&upper, HEADLIGHT_THRESHOLD))
        .into_iter()
        .filter(|r| r.area > HEADLIGHT_AREA.0 && r.area < HEADLIGHT_AREA.1)
        .map(|r| (r.center(), r.area))
        .collect()
}

/// Center of mass of edges in the central crop: (center, edge count).
fn grille_center(gray: &GrayImage) -> Option<(Point2D, f64)> {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as i32, h as i32);
    let (ox, oy) = (w / 4, h / 4);
    let center = Bounds::new(ox, oy, 3 * w / 4 - ox, 3 * h / 4 - oy);
    let edges = stats::edges(&threshold::crop(gray, &center));

    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for (x, y, px) in edges.enumerate_pixels() {
        if px.0[0] > 0 {
            sx += (x as i32 + ox) as f64;
            sy += (y as i32 + oy) as f64;
            n += 1;
        }
    }
    if n <= GRILLE_MIN_EDGE_PIXELS {
        return None;
    }
    Some((Point2D::new(sx / n as f64, sy / n as f64), n as f64))
}

// ============================================================================
// REAR LANDMARKS
// ============================================================================

fn rear_elements(raster: &Raster, gray: &GrayImage) -> Vec<StructuralElement> {
    let mut elements: Vec<StructuralElement> = taillights(raster, gray)
        .into_iter()
        .map(|(position, size)| StructuralElement {
            kind: StructuralKind::Taillight,
            position,
            size,
        })
        .collect();
    if let Some((position, size)) = bumper_line(gray) {
        elements.push(StructuralElement {
            kind: StructuralKind::BumperLine,
            position,
            size,
        });
    }
    elements
}

/// Red blobs when color is available, otherwise (or when none are red)
/// bright blobs.
fn taillights(raster: &Raster, gray: &GrayImage) -> Vec<(Point2D, f64)> {
    let mut found = Vec::new();
    if let Some(rgb) = raster.to_rgb() {
        found = external_regions(&red_mask(&rgb, RedHue::Wrapped))
            .into_iter()
            .filter(|r| r.area > TAILLIGHT_RED_AREA.0 && r.area < TAILLIGHT_RED_AREA.1)
            .map(|r| (r.center(), r.area))
            .collect();
    }
    if found.is_empty() {
        found = external_regions(&threshold::above(gray, TAILLIGHT_BRIGHT_THRESHOLD))
            .into_iter()
            .filter(|r| r.area > TAILLIGHT_BRIGHT_AREA.0 && r.area < TAILLIGHT_BRIGHT_AREA.1)
            .map(|r| (r.center(), r.area))
            .collect();
    }
    found
}

/// Longest near-horizontal segment of the lower half: (center, length).
fn bumper_line(gray: &GrayImage) -> Option<(Point2D, f64)> {
    let (w, h) = gray.dimensions();
    let oy = (h / 2) as i32;
    let lower = threshold::crop(gray, &Bounds::new(0, oy, w as i32, h as i32 - oy));
    let edges = stats::edges(&lower);

    let mut best: Option<(Point2D, f64)> = None;
    for s in horizontal_segments(&edges, BUMPER_MIN_VOTES, DEFAULT_MAX_GAP) {
        if s.dy() >= BUMPER_MAX_DY {
            continue;
        }
        let length = s.dx() as f64;
        if best.map_or(true, |(_, l)| length > l) {
            best = Some((s.offset(0, oy).center(), length));
        }
    }
    best.filter(|(p, _)| p.x > 0.0 && p.y > 0.0)
}
