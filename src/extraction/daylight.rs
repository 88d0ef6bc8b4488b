// src/extraction/daylight.rs
//
// Daylight-only appearance features: color profile, badges near the
// vertical center line, chrome / dark trim strips and a whole-image
// surface texture vector.

use super::ir_signature::texture_features;
use crate::color_analysis::color_profile;
use crate::raster::Raster;
use crate::types::{
    BadgeFeature, BlobShape, Bounds, DaylightFeatures, TextureSignature, TrimFeature, TrimKind,
    TrimTexture,
};
use crate::vision::{external_regions, horizontal_segments, stats, threshold, Segment, DEFAULT_MAX_GAP};
use image::GrayImage;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

const BADGE_THRESHOLD: u8 = 200;
const BADGE_AREA: (f64, f64) = (50.0, 1500.0);
const BADGE_ASPECT: (f64, f64) = (0.5, 2.0);
/// Horizontal band, as fractions of width, a badge center must fall in.
const BADGE_COLUMN: (f64, f64) = (0.3, 0.7);
const ROUND_CIRCULARITY: f64 = 0.7;

const TRIM_MIN_VOTES: usize = 30;
const TRIM_MIN_LENGTH: i32 = 60;
const TRIM_MAX_DY: i32 = 10;
const CHROME_BRIGHTNESS: f64 = 170.0;
const MOLDING_BRIGHTNESS: f64 = 90.0;
/// Rows sampled on each side of a trim edge.
const TRIM_BAND: i32 = 3;
const SMOOTH_RESIDUAL: f64 = 8.0;
const TRIM_SIGMA: f32 = 1.1;

pub const SURFACE_TEXTURE_KIND: &str = "surface";

// ============================================================================
// EXTRACTION
// ============================================================================

pub fn extract(raster: &Raster) -> DaylightFeatures {
    let gray = raster.to_gray();
    let features = DaylightFeatures {
        color_profile: color_profile(raster),
        badge_locations: badges(&gray),
        trim_details: trims(&gray),
        surface_texture: TextureSignature {
            features: texture_features(&gray),
            kind: SURFACE_TEXTURE_KIND.to_string(),
        },
    };
    debug!(
        "☀️ Daylight: {} dominant color(s), {} badge(s), {} trim strip(s)",
        features.color_profile.dominant_colors.len(),
        features.badge_locations.len(),
        features.trim_details.len()
    );
    features
}

fn badges(gray: &GrayImage) -> Vec<BadgeFeature> {
    let width = gray.width() as f64;
    let (col_lo, col_hi) = (width * BADGE_COLUMN.0, width * BADGE_COLUMN.1);

    external_regions(&threshold::above(gray, BADGE_THRESHOLD))
        .into_iter()
        .filter(|r| r.area >= BADGE_AREA.0 && r.area <= BADGE_AREA.1)
        .filter(|r| {
            let aspect = r.aspect_ratio();
            aspect >= BADGE_ASPECT.0 && aspect <= BADGE_ASPECT.1
        })
        .filter(|r| {
            let cx = r.center().x;
            cx >= col_lo && cx <= col_hi
        })
        .map(|r| BadgeFeature {
            position: r.center(),
            size: r.area,
            shape: if r.circularity() > ROUND_CIRCULARITY {
                BlobShape::Round
            } else {
                BlobShape::Angular
            },
        })
        .collect()
}

/// Long near-horizontal edges bordering a very bright (chrome) or very
/// dark (rubber molding) strip. The strip side is whichever of the two
/// bands next to the edge decides the kind.
fn trims(gray: &GrayImage) -> Vec<TrimFeature> {
    let edges = stats::edges(gray);
    horizontal_segments(&edges, TRIM_MIN_VOTES, DEFAULT_MAX_GAP)
        .into_iter()
        .filter(|s| s.dx() > TRIM_MIN_LENGTH && s.dy() < TRIM_MAX_DY)
        .filter_map(|s| classify_trim(gray, &s))
        .collect()
}

fn classify_trim(gray: &GrayImage, segment: &Segment) -> Option<TrimFeature> {
    let y = segment.mid_y();
    let x = segment.x1.min(segment.x2);
    let width = segment.dx() + 1;
    let above = Bounds::new(x, y - TRIM_BAND, width, TRIM_BAND);
    let below = Bounds::new(x, y + 1, width, TRIM_BAND);

    let (above_mean, below_mean) = (stats::region_mean(gray, &above), stats::region_mean(gray, &below));
    let (bright, dark) = if above_mean >= below_mean {
        ((above_mean, above), (below_mean, below))
    } else {
        ((below_mean, below), (above_mean, above))
    };

    let (kind, surface) = if bright.0 > CHROME_BRIGHTNESS {
        (TrimKind::Chrome, bright.1)
    } else if dark.0 < MOLDING_BRIGHTNESS {
        (TrimKind::Molding, dark.1)
    } else {
        return None;
    };

    let residual = stats::gaussian_residual(&threshold::crop(gray, &surface), TRIM_SIGMA);
    Some(TrimFeature {
        position: segment.center(),
        kind,
        texture: if residual < SMOOTH_RESIDUAL {
            TrimTexture::Smooth
        } else {
            TrimTexture::Textured
        },
    })
}
