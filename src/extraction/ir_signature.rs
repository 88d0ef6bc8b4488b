// src/extraction/ir_signature.rs
//
// Infrared fingerprint of the material around the license plate.
//
// The plate itself is located first, then every measurement is taken over
// the surrounding region with the plate's own pixels masked out where a
// per-pixel mask applies (the reflectivity grid). A plate moved to another
// vehicle keeps its own brightness but inherits a different surround.

use crate::extraction::plate::detect_plate;
use crate::types::{
    Bounds, IRSignature, LicensePlateRegion, Point2D, ILLUMINATION_DIRECTIONS,
    MATERIAL_SIGNATURE_LEN, TEXTURE_FEATURES_LEN,
};
use crate::vision::{external_regions, stats, threshold};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Expansion of the plate box on each side, as a fraction of its size.
const SURROUND_EXPANSION: f64 = 0.75;
const GRID_SIZE: i32 = 8;

const HIGH_REFLECTIVITY: u8 = 200;
const MID_REFLECTIVITY_LOW: u8 = 100;
const LOW_REFLECTIVITY: u8 = 80;

const GRADIENT_DISTANCES: [i32; 3] = [10, 20, 30];

const SHADOW_THRESHOLD: u8 = 60;
const MIN_SHADOW_AREA: f64 = 50.0;

/// Sigma of the 5×5 Gaussian used for the local-variance residual.
const TEXTURE_SIGMA: f32 = 1.1;

// ============================================================================
// EXTRACTION
// ============================================================================

pub fn extract(gray: &GrayImage) -> IRSignature {
    extract_around(gray, detect_plate(gray))
}

/// Builds the signature around an already located plate.
pub fn extract_around(gray: &GrayImage, plate: LicensePlateRegion) -> IRSignature {
    let surrounding = surrounding_region(&plate.bounds, gray.width(), gray.height());
    let roi = threshold::crop(gray, &surrounding);

    let signature = IRSignature {
        reflectivity_map: reflectivity_map(&roi, &surrounding, &plate.bounds),
        material_signature: material_signature(&roi),
        illumination_gradient: illumination_gradient(&roi, &surrounding, &plate.bounds),
        shadow_patterns: shadow_patterns(&roi, &surrounding),
        texture_features: texture_features(&roi),
        plate_region: plate,
        surrounding_region: surrounding,
    };

    debug!(
        "IR signature: surround {}x{} at ({}, {}), {} shadows, plate confidence {:.2}",
        surrounding.width,
        surrounding.height,
        surrounding.x,
        surrounding.y,
        signature.shadow_patterns.len(),
        signature.plate_region.confidence
    );
    signature
}

/// Plate box grown by 0.75× its width and height on every side, clipped
/// to the image.
pub fn surrounding_region(plate: &Bounds, width: u32, height: u32) -> Bounds {
    let expand_x = (plate.width as f64 * SURROUND_EXPANSION) as i32;
    let expand_y = (plate.height as f64 * SURROUND_EXPANSION) as i32;

    let x = (plate.x - expand_x).max(0);
    let y = (plate.y - expand_y).max(0);
    let w = (width as i32 - x).min(plate.width + 2 * expand_x);
    let h = (height as i32 - y).min(plate.height + 2 * expand_y);

    Bounds::new(x, y, w, h).clip_to(width, height)
}

// ============================================================================
// REFLECTIVITY GRID
// ============================================================================

/// 8×8 grid of mean brightness / 255 over unmasked pixels. Cells that lie
/// entirely inside the plate read 0.0.
fn reflectivity_map(roi: &GrayImage, surrounding: &Bounds, plate: &Bounds) -> Vec<Vec<f64>> {
    let mut map = vec![vec![0.0; GRID_SIZE as usize]; GRID_SIZE as usize];
    let cell_w = roi.width() as i32 / GRID_SIZE;
    let cell_h = roi.height() as i32 / GRID_SIZE;
    if cell_w == 0 || cell_h == 0 {
        return map;
    }

    // Plate box in ROI coordinates.
    let masked = Bounds::new(
        plate.x - surrounding.x,
        plate.y - surrounding.y,
        plate.width,
        plate.height,
    );

    for (row, cells) in map.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            let x0 = col as i32 * cell_w;
            let y0 = row as i32 * cell_h;
            let (mut sum, mut count) = (0u64, 0u64);
            for y in y0..y0 + cell_h {
                for x in x0..x0 + cell_w {
                    if masked.contains(x, y) {
                        continue;
                    }
                    sum += roi.get_pixel(x as u32, y as u32).0[0] as u64;
                    count += 1;
                }
            }
            if count > 0 {
                *cell = sum as f64 / count as f64 / 255.0;
            }
        }
    }
    map
}

// ============================================================================
// MATERIAL
// ============================================================================

/// High / mid / low reflectivity fractions, edge density, Laplacian
/// roughness and brightness spread, each in [0, 1].
pub fn material_signature(gray: &GrayImage) -> [f64; MATERIAL_SIGNATURE_LEN] {
    let total = gray.as_raw().len();
    if total == 0 {
        return [0.0; MATERIAL_SIGNATURE_LEN];
    }
    let fraction = |mask: GrayImage| threshold::count_foreground(&mask) as f64 / total as f64;

    let (_, lap_std) = stats::laplacian_stats(gray);
    let (_, std) = stats::mean_std(gray);

    [
        fraction(threshold::above(gray, HIGH_REFLECTIVITY)),
        fraction(threshold::band(gray, MID_REFLECTIVITY_LOW, HIGH_REFLECTIVITY)),
        fraction(threshold::below(gray, LOW_REFLECTIVITY)),
        stats::edge_fraction(gray),
        (lap_std / 255.0).min(1.0),
        (std / 255.0).min(1.0),
    ]
}

// ============================================================================
// ILLUMINATION
// ============================================================================

/// Mean single-pixel brightness / 255 at 10, 20 and 30 px from the plate
/// center, per direction: top, right, bottom, left. Samples outside the
/// region are skipped; a direction with none reads 0.
fn illumination_gradient(
    roi: &GrayImage,
    surrounding: &Bounds,
    plate: &Bounds,
) -> [f64; ILLUMINATION_DIRECTIONS] {
    let cx = plate.x - surrounding.x + plate.width / 2;
    let cy = plate.y - surrounding.y + plate.height / 2;
    let directions: [(i32, i32); ILLUMINATION_DIRECTIONS] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
    let (w, h) = (roi.width() as i32, roi.height() as i32);

    let mut gradient = [0.0; ILLUMINATION_DIRECTIONS];
    for (slot, (dx, dy)) in gradient.iter_mut().zip(directions) {
        let (mut sum, mut samples) = (0.0, 0usize);
        for d in GRADIENT_DISTANCES {
            let (x, y) = (cx + dx * d, cy + dy * d);
            if x >= 0 && x < w && y >= 0 && y < h {
                sum += roi.get_pixel(x as u32, y as u32).0[0] as f64 / 255.0;
                samples += 1;
            }
        }
        if samples > 0 {
            *slot = sum / samples as f64;
        }
    }
    gradient
}

// ============================================================================
// SHADOWS
// ============================================================================

/// Centers of dark blobs in absolute image coordinates.
fn shadow_patterns(roi: &GrayImage, surrounding: &Bounds) -> Vec<Point2D> {
    let dark = threshold::below(roi, SHADOW_THRESHOLD);
    external_regions(&dark)
        .into_iter()
        .filter(|r| r.area > MIN_SHADOW_AREA)
        .map(|r| {
            let c = r.center();
            Point2D::new(c.x + surrounding.x as f64, c.y + surrounding.y as f64)
        })
        .collect()
}

// ============================================================================
// TEXTURE
// ============================================================================

/// Local variance, gradient magnitude, horizontal directionality and
/// normalized entropy.
pub fn texture_features(gray: &GrayImage) -> [f64; TEXTURE_FEATURES_LEN] {
    if gray.as_raw().is_empty() {
        return [0.0; TEXTURE_FEATURES_LEN];
    }
    let gradients = stats::sobel_stats(gray);
    [
        (stats::gaussian_residual(gray, TEXTURE_SIGMA) / 255.0).min(1.0),
        (gradients.mean_magnitude / 255.0).min(1.0),
        gradients.directionality(),
        (stats::entropy(gray) / 8.0).min(1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;

    fn fill(img: &mut GrayImage, b: Bounds, v: u8) {
        for y in b.y..b.bottom() {
            for x in b.x..b.right() {
                img.put_pixel(x as u32, y as u32, Luma([v]));
            }
        }
    }

    fn plate_at(bounds: Bounds) -> LicensePlateRegion {
        LicensePlateRegion {
            bounds,
            confidence: 0.9,
            avg_brightness: 230.0,
            is_reflective: true,
        }
    }

    #[test]
    fn test_surrounding_region_expands_and_clips() {
        let inner = surrounding_region(&Bounds::new(260, 360, 120, 40), 640, 480);
        assert_eq!(inner, Bounds::new(170, 330, 300, 100));

        let corner = surrounding_region(&Bounds::new(10, 10, 100, 30), 200, 100);
        assert_eq!(corner, Bounds::new(0, 0, 200, 74));
    }

    #[test]
    fn test_plate_pixels_never_reach_the_grid() {
        let plate = Bounds::new(260, 360, 120, 40);
        let mut img = GrayImage::from_pixel(640, 480, Luma([120]));
        fill(&mut img, plate, 235);

        let sig = extract(&img);
        assert_eq!(sig.plate_region.bounds, plate);
        assert_eq!(sig.reflectivity_map.len(), 8);

        let surround = 120.0 / 255.0;
        let mut masked_cells = 0;
        for row in &sig.reflectivity_map {
            assert_eq!(row.len(), 8);
            for &v in row {
                if v == 0.0 {
                    masked_cells += 1;
                } else {
                    assert_abs_diff_eq!(v, surround, epsilon = 1e-12);
                }
            }
        }
        assert!(masked_cells > 0);
    }

    #[test]
    fn test_material_fractions() {
        let plate = Bounds::new(260, 360, 120, 40);
        let mut img = GrayImage::from_pixel(640, 480, Luma([120]));
        fill(&mut img, plate, 235);

        let sig = extract(&img);
        // Surround 300×100, plate 120×40.
        assert_abs_diff_eq!(sig.material_signature[0], 4800.0 / 30000.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sig.material_signature[1], 25200.0 / 30000.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sig.material_signature[2], 0.0);
        assert!(sig.material_signature[3] > 0.0);
        for v in sig.material_signature {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_illumination_gradient_on_uniform_surround() {
        let img = GrayImage::from_pixel(300, 200, Luma([102]));
        let sig = extract_around(&img, plate_at(Bounds::new(100, 100, 80, 30)));
        for v in sig.illumination_gradient {
            assert_abs_diff_eq!(v, 0.4, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_illumination_skips_out_of_bounds_samples() {
        let mut img = GrayImage::from_pixel(200, 100, Luma([51]));
        // Brighter band above the plate.
        fill(&mut img, Bounds::new(0, 0, 200, 5), 255);
        let sig = extract_around(&img, plate_at(Bounds::new(60, 10, 80, 20)));
        // Surround is rows 0..50 with center y = 20. Top samples y = 10 and
        // y = 0 (band), bottom samples y = 30 and y = 40.
        assert_eq!(sig.surrounding_region, Bounds::new(0, 0, 200, 50));
        assert_abs_diff_eq!(sig.illumination_gradient[0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(sig.illumination_gradient[2], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_shadows_reported_in_image_coordinates() {
        let mut img = GrayImage::from_pixel(300, 200, Luma([150]));
        fill(&mut img, Bounds::new(50, 120, 20, 20), 10);
        let sig = extract_around(&img, plate_at(Bounds::new(100, 100, 80, 30)));
        assert_eq!(sig.surrounding_region, Bounds::new(40, 78, 200, 74));
        assert_eq!(sig.shadow_patterns, vec![Point2D::new(60.0, 130.0)]);
    }

    #[test]
    fn test_small_blobs_are_not_shadows() {
        let mut img = GrayImage::from_pixel(300, 200, Luma([150]));
        fill(&mut img, Bounds::new(50, 120, 5, 5), 10);
        let sig = extract_around(&img, plate_at(Bounds::new(100, 100, 80, 30)));
        assert!(sig.shadow_patterns.is_empty());
    }

    #[test]
    fn test_flat_texture() {
        let t = texture_features(&GrayImage::from_pixel(40, 40, Luma([90])));
        assert_eq!(t, [0.0; TEXTURE_FEATURES_LEN]);
        assert_eq!(texture_features(&GrayImage::new(0, 0)), [0.0; TEXTURE_FEATURES_LEN]);
    }
}
