// src/vision/lines.rs
//
// Near-horizontal line segments from an edge map.
//
// Walks each unvisited edge pixel rightwards, following the same row first
// and then one row up or down, bridging gaps of up to `max_gap` columns.
// The pixel count of a chain plays the role of the Hough vote count.
// Callers apply their own |dy| / |dx| filters on the returned segments.

use crate::types::Point2D;
use image::GrayImage;

pub const DEFAULT_MAX_GAP: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub votes: usize,
}

impl Segment {
    pub fn dx(&self) -> i32 {
        (self.x2 - self.x1).abs()
    }

    pub fn dy(&self) -> i32 {
        (self.y2 - self.y1).abs()
    }

    pub fn length(&self) -> f64 {
        (self.dx() as f64).hypot(self.dy() as f64)
    }

    pub fn mid_y(&self) -> i32 {
        (self.y1 + self.y2) / 2
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.x1 + self.x2) as f64 / 2.0,
            (self.y1 + self.y2) as f64 / 2.0,
        )
    }

    pub fn offset(self, ox: i32, oy: i32) -> Segment {
        Segment {
            x1: self.x1 + ox,
            y1: self.y1 + oy,
            x2: self.x2 + ox,
            y2: self.y2 + oy,
            votes: self.votes,
        }
    }
}

/// Segments with at least `min_votes` edge pixels, in scan order.
pub fn horizontal_segments(edges: &GrayImage, min_votes: usize, max_gap: u32) -> Vec<Segment> {
    let (w, h) = edges.dimensions();
    let (w, h) = (w as i32, h as i32);
    let raw = edges.as_raw();
    let idx = |x: i32, y: i32| (y * w + x) as usize;
    let is_edge = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h && raw[idx(x, y)] > 0;

    let mut visited = vec![false; raw.len()];
    let mut segments = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if !is_edge(x, y) || visited[idx(x, y)] {
                continue;
            }
            visited[idx(x, y)] = true;
            let (mut cx, mut cy) = (x, y);
            let mut votes = 1usize;

            'walk: loop {
                for step in 1..=(max_gap as i32 + 1) {
                    let nx = cx + step;
                    if nx >= w {
                        break 'walk;
                    }
                    for ny in [cy, cy - 1, cy + 1] {
                        if is_edge(nx, ny) && !visited[idx(nx, ny)] {
                            visited[idx(nx, ny)] = true;
                            cx = nx;
                            cy = ny;
                            votes += 1;
                            continue 'walk;
                        }
                    }
                }
                break;
            }

            if votes >= min_votes {
                segments.push(Segment {
                    x1: x,
                    y1: y,
                    x2: cx,
                    y2: cy,
                    votes,
                });
            }
        }
    }
    segments
}
