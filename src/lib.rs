// src/lib.rs
//
// Same-vehicle verification for license-plate-swap detection.
//
// Two images of the same side of a vehicle (front or rear) are reduced to
// plate-independent feature sets and scored against each other. A plate
// that moved between vehicles keeps its own pixels but not the body,
// lights, bumper or infrared surround it sits in.

pub mod color_analysis;
pub mod comparison;
pub mod config;
pub mod error;
pub mod extraction;
pub mod input;
pub mod preprocessing;
pub mod raster;
pub mod service;
pub mod types;
pub mod vision;

pub use comparison::ComparisonEngine;
pub use config::EngineConfig;
pub use error::{CompareError, Result};
pub use extraction::{extract_features, ExtractionPipeline, FeatureExtractor};
pub use raster::Raster;
pub use service::{CaptureLabels, VehicleComparisonService};
pub use types::{
    ComparisonResult, ConfidenceLevel, DetailedScores, LightingType, ProcessingInfo,
    VehicleFeatures, VehicleImage, VehicleView,
};
