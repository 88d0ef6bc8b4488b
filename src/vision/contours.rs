// src/vision/contours.rs
//
// External contours of a binary mask, reduced to the measurements the
// extractors use: bounding box, polygon area, chain perimeter.

use crate::types::{Bounds, Point2D};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bounds: Bounds,
    /// Shoelace area of the boundary polygon (0 for lines and single pixels).
    pub area: f64,
    pub perimeter: f64,
}

impl Region {
    pub fn center(&self) -> Point2D {
        self.bounds.center()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.bounds.aspect_ratio()
    }

    pub fn box_area(&self) -> f64 {
        self.bounds.area() as f64
    }

    /// 4πA/P², 0 for degenerate outlines.
    pub fn circularity(&self) -> f64 {
        if self.perimeter <= 0.0 {
            return 0.0;
        }
        4.0 * PI * self.area / (self.perimeter * self.perimeter)
    }
}

/// Outermost borders only, in tracer scan order.
pub fn external_regions(mask: &GrayImage) -> Vec<Region> {
    let contours: Vec<Contour<i32>> = find_contours(mask);
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| region_from_points(&c.points))
        .collect()
}

fn region_from_points(points: &[Point<i32>]) -> Region {
    let (mut x0, mut y0) = (i32::MAX, i32::MAX);
    let (mut x1, mut y1) = (i32::MIN, i32::MIN);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Region {
        bounds: Bounds::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
        area: polygon_area(points),
        perimeter: chain_perimeter(points),
    }
}

pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        acc += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (acc as f64 / 2.0).abs()
}

/// Closed-chain length.
pub fn chain_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let q = &points[(i + 1) % points.len()];
            ((p.x - q.x) as f64).hypot((p.y - q.y) as f64)
        })
        .sum()
}
