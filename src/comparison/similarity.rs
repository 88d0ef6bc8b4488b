// src/comparison/similarity.rs
//
// Scalar and point-set similarity primitives shared by every category.
// All return values in [0, 1].

use super::matching::{best_similarity, nearest_distance};
use super::sanitize::{safe, NEUTRAL};
use crate::types::{Bounds, Point2D};

// ============================================================================
// CONFIGURATION
// ============================================================================

const REFERENCE_MATCH_DISTANCE: f64 = 50.0;
const REFERENCE_DISTANCE_SCALE: f64 = 20.0;

const CONTOUR_MATCH_DISTANCE: f64 = 30.0;
const CONTOUR_DISTANCE_SCALE: f64 = 15.0;

const SHADOW_DISTANCE_SCALE: f64 = 50.0;
const SHADOW_MATCH_THRESHOLD: f64 = 0.3;

const PLATE_DISTANCE_SCALE: f64 = 20.0;

// ============================================================================
// SCALARS
// ============================================================================

/// `1 − |a − b| / max(a, b)`, or `default` when the larger value is not
/// positive.
pub fn ratio_similarity(a: f64, b: f64, default: f64) -> f64 {
    let max = a.max(b);
    if max > 0.0 {
        1.0 - (a - b).abs() / max
    } else {
        default
    }
}

/// Size agreement with the neutral 0.5 for two zero sizes.
pub fn size_similarity(a: f64, b: f64) -> f64 {
    ratio_similarity(a, b, NEUTRAL)
}

/// Cosine similarity. Different lengths and zero vectors score 0; two
/// empty vectors are identical.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    if a.is_empty() {
        return 1.0;
    }
    let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    safe(dot / (na.sqrt() * nb.sqrt()), 0.0)
}

// ============================================================================
// POINT SETS
// ============================================================================

/// Alignment of landmark sets: `exp(−mean distance / 20)` over points with
/// a partner closer than 50 px. Neutral when either set is empty.
pub fn reference_points(a: &[Point2D], b: &[Point2D]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return NEUTRAL;
    }
    match nearest_distance(a, b, REFERENCE_MATCH_DISTANCE, Point2D::distance).mean() {
        Some(avg) => safe((-avg / REFERENCE_DISTANCE_SCALE).exp(), NEUTRAL),
        None => 0.0,
    }
}

/// Bumper outline agreement: 30 px match radius, `exp(−mean / 15)`.
pub fn contour_points(a: &[Point2D], b: &[Point2D]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    match nearest_distance(a, b, CONTOUR_MATCH_DISTANCE, Point2D::distance).mean() {
        Some(avg) => safe((-avg / CONTOUR_DISTANCE_SCALE).exp(), NEUTRAL),
        None => 0.0,
    }
}

/// Shadow centers matched at `exp(−d / 50) > 0.3`, with the matched total
/// divided by the smaller set's size so that count mismatches cost more
/// than plain averaging would.
pub fn shadow_points(a: &[Point2D], b: &[Point2D]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let m = best_similarity(a, b, SHADOW_MATCH_THRESHOLD, |p, q| {
        Some((-p.distance(q) / SHADOW_DISTANCE_SCALE).exp())
    });
    if m.count == 0 {
        return 0.0;
    }
    safe(m.total / a.len().min(b.len()) as f64, NEUTRAL)
}

/// Plate placement: `0.6·exp(−center distance / 20) + 0.4·area agreement`.
pub fn plate_area(a: &Bounds, b: &Bounds) -> f64 {
    let position = (-a.center().distance(&b.center()) / PLATE_DISTANCE_SCALE).exp();
    let size = size_similarity(a.area() as f64, b.area() as f64);
    safe(0.6 * position + 0.4 * size, NEUTRAL)
}

/// `1 − mean |Δcell|` for grids of identical shape, 0 otherwise.
pub fn grid(a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.len() != b.len() || a.iter().zip(b).any(|(ra, rb)| ra.len() != rb.len()) {
        return 0.0;
    }
    let (mut total, mut cells) = (0.0, 0usize);
    for (ra, rb) in a.iter().zip(b) {
        for (x, y) in ra.iter().zip(rb) {
            total += (x - y).abs();
            cells += 1;
        }
    }
    if cells == 0 {
        return 0.0;
    }
    safe(1.0 - total / cells as f64, NEUTRAL)
}
