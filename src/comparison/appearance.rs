// src/comparison/appearance.rs
//
// Daylight color category: dominant colors, badges, trim strips and the
// surface texture vector.

use super::matching::best_similarity;
use super::sanitize::{safe, NEUTRAL};
use super::similarity::{cosine, size_similarity};
use crate::types::{BadgeFeature, Color, ColorProfile, DaylightFeatures, TrimFeature};

const MATCH_THRESHOLD: f64 = 0.3;
/// Largest possible RGB distance, √(3·255²).
const MAX_RGB_DISTANCE: f64 = 441.67;
const BADGE_DISTANCE_SCALE: f64 = 30.0;
const TRIM_DISTANCE_SCALE: f64 = 30.0;

pub fn color(a: &DaylightFeatures, b: &DaylightFeatures) -> f64 {
    let profile = color_profile(&a.color_profile, &b.color_profile);
    let badges = badges(&a.badge_locations, &b.badge_locations);
    let trims = trims(&a.trim_details, &b.trim_details);
    let texture = cosine(&a.surface_texture.features, &b.surface_texture.features);
    safe(0.4 * profile + 0.2 * badges + 0.2 * trims + 0.2 * texture, NEUTRAL)
}

pub fn color_profile(a: &ColorProfile, b: &ColorProfile) -> f64 {
    matched_mean(&a.dominant_colors, &b.dominant_colors, |x, y| Some(color_similarity(x, y)))
}

fn color_similarity(a: &Color, b: &Color) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    1.0 - (dr * dr + dg * dg + db * db).sqrt() / MAX_RGB_DISTANCE
}

pub fn badges(a: &[BadgeFeature], b: &[BadgeFeature]) -> f64 {
    matched_mean(a, b, |x, y| {
        (x.shape == y.shape).then(|| {
            let position = (-x.position.distance(&y.position) / BADGE_DISTANCE_SCALE).exp();
            0.7 * position + 0.3 * size_similarity(x.size, y.size)
        })
    })
}

pub fn trims(a: &[TrimFeature], b: &[TrimFeature]) -> f64 {
    matched_mean(a, b, |x, y| {
        (x.kind == y.kind).then(|| {
            let position = (-x.position.distance(&y.position) / TRIM_DISTANCE_SCALE).exp();
            let texture = if x.texture == y.texture { 1.0 } else { 0.0 };
            0.7 * position + 0.3 * texture
        })
    })
}

/// Both empty: identical. One empty: nothing in common. Otherwise the
/// mean of the greedy best matches above the threshold.
fn matched_mean<T, F>(a: &[T], b: &[T], similarity: F) -> f64
where
    F: Fn(&T, &T) -> Option<f64>,
{
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    best_similarity(a, b, MATCH_THRESHOLD, |x, y| similarity(x, y).map(|s| safe(s, 0.0)))
        .mean()
        .unwrap_or(0.0)
}
