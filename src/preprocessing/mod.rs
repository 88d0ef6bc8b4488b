// src/preprocessing/mod.rs
//
// Per-image gates that run before any feature extraction:
//   Raster → quality::assess ───────────────┐
//   Raster → classifier::classify_view ─────┼→ service gates → VehicleImage
//   Raster → classifier::classify_lighting ─┘

pub mod classifier;
pub mod quality;

pub use classifier::{classify_lighting, classify_view, LightingClassification, ViewClassification};
pub use quality::{assess, assess_detailed, QualityReport};
