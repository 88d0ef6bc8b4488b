// src/vision/mod.rs
//
// Image-processing building blocks shared by preprocessing and extraction.
// Thin adapters over `imageproc` plus the few operators it lacks
// (mean adaptive threshold with offset, horizontal segment tracing).

pub mod contours;
pub mod integral;
pub mod lines;
pub mod stats;
pub mod threshold;

pub use contours::{external_regions, Region};
pub use integral::IntegralImage;
pub use lines::{horizontal_segments, Segment, DEFAULT_MAX_GAP};
