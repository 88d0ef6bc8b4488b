// src/config.rs
//
// Engine configuration. Every default reproduces the built-in constants,
// so running without a config file behaves exactly like the compiled engine.

use crate::error::{CompareError, Result};
use crate::types::LightingType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gates: GateConfig,
    pub comparison: ComparisonConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Hard reject before classification.
    pub min_quality: f64,
    /// View and lighting classifiers must both reach this.
    pub min_classification_confidence: f64,
    /// Post-classification consistency gate.
    pub min_comparison_quality: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.3,
            min_classification_confidence: 0.5,
            min_comparison_quality: 0.5,
        }
    }
}

/// Per-category weights applied to the overall similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub geometric: f64,
    pub light_pattern: f64,
    pub bumper: f64,
    pub color: f64,
    pub thermal: f64,
}

impl CategoryWeights {
    pub const DAYLIGHT: CategoryWeights = CategoryWeights {
        geometric: 0.30,
        light_pattern: 0.30,
        bumper: 0.20,
        color: 0.20,
        thermal: 0.0,
    };

    pub const INFRARED: CategoryWeights = CategoryWeights {
        geometric: 0.35,
        light_pattern: 0.35,
        bumper: 0.20,
        color: 0.0,
        thermal: 0.10,
    };

    pub fn sum(&self) -> f64 {
        self.geometric + self.light_pattern + self.bumper + self.color + self.thermal
    }

    fn as_array(&self) -> [f64; 5] {
        [
            self.geometric,
            self.light_pattern,
            self.bumper,
            self.color,
            self.thermal,
        ]
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CompareError::InvalidConfig(format!(
                "{} weights must be finite and non-negative",
                name
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CompareError::InvalidConfig(format!(
                "{} weights sum to {:.6}, expected 1.0",
                name, sum
            )));
        }
        Ok(())
    }
}

/// Lighting-adaptive weight table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub daylight: CategoryWeights,
    pub infrared: CategoryWeights,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            daylight: CategoryWeights::DAYLIGHT,
            infrared: CategoryWeights::INFRARED,
        }
    }
}

impl WeightTable {
    /// Unknown lighting never reaches the engine; it shares the infrared
    /// row since both use the lower-information feature set.
    pub fn for_lighting(&self, lighting: LightingType) -> &CategoryWeights {
        match lighting {
            LightingType::Daylight => &self.daylight,
            LightingType::Infrared | LightingType::Unknown => &self.infrared,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub weights: WeightTable,
    pub daylight_threshold: f64,
    pub infrared_threshold: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            daylight_threshold: 0.75,
            infrared_threshold: 0.70,
        }
    }
}

impl ComparisonConfig {
    pub fn threshold_for(&self, lighting: LightingType) -> f64 {
        match lighting {
            LightingType::Daylight => self.daylight_threshold,
            LightingType::Infrared | LightingType::Unknown => self.infrared_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CompareError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(contents)
            .map_err(|e| CompareError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.comparison.weights.daylight.validate("daylight")?;
        self.comparison.weights.infrared.validate("infrared")?;
        // Color is never measured under infrared, thermal never in daylight.
        if self.comparison.weights.daylight.thermal != 0.0 {
            return Err(CompareError::InvalidConfig(
                "daylight.thermal weight must be 0: no thermal features in daylight".to_string(),
            ));
        }
        if self.comparison.weights.infrared.color != 0.0 {
            return Err(CompareError::InvalidConfig(
                "infrared.color weight must be 0: no color features in infrared".to_string(),
            ));
        }

        let unit = [
            ("comparison.daylight_threshold", self.comparison.daylight_threshold),
            ("comparison.infrared_threshold", self.comparison.infrared_threshold),
            ("gates.min_quality", self.gates.min_quality),
            (
                "gates.min_classification_confidence",
                self.gates.min_classification_confidence,
            ),
            ("gates.min_comparison_quality", self.gates.min_comparison_quality),
        ];
        for (name, value) in unit {
            if !(value > 0.0 && value < 1.0) {
                return Err(CompareError::InvalidConfig(format!(
                    "{} must lie in (0, 1), got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
