// src/extraction/lighting.rs
//
// Lighting-specific block: daylight appearance features or the infrared
// set (with the IR signature). Unknown lighting has no block.

use super::{daylight, infrared, FeatureBlock, FeatureExtractor};
use crate::error::{CompareError, Result};
use crate::types::{LightingFeatures, LightingType, VehicleImage};

#[derive(Debug, Clone, Copy, Default)]
pub struct LightingFeatureExtractor;

impl FeatureExtractor for LightingFeatureExtractor {
    fn name(&self) -> &'static str {
        "lighting"
    }

    fn extract(&self, image: &VehicleImage) -> Result<FeatureBlock> {
        let block = match image.lighting {
            LightingType::Daylight => LightingFeatures::Daylight(daylight::extract(&image.raster)),
            LightingType::Infrared => {
                LightingFeatures::Infrared(infrared::extract(&image.raster.to_gray()))
            }
            LightingType::Unknown => return Err(CompareError::UnsupportedLighting),
        };
        Ok(FeatureBlock::Lighting(block))
    }
}
