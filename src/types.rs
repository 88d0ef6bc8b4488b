// src/types.rs
//
// Data model shared by preprocessing, feature extraction and comparison.
// Feature structs are produced once per image and never mutated after.

use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LABELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleView {
    Front,
    Rear,
    Unknown,
}

impl VehicleView {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleView::Front => "front",
            VehicleView::Rear => "rear",
            VehicleView::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VehicleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingType {
    Daylight,
    Infrared,
    Unknown,
}

impl LightingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightingType::Daylight => "daylight",
            LightingType::Infrared => "infrared",
            LightingType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LightingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GEOMETRY PRIMITIVES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Half-open containment: [x, x+w) × [y, y+h).
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Pixel-snapped center (integer half extents).
    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.x + self.width / 2) as f64,
            (self.y + self.height / 2) as f64,
        )
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Intersection with `[0, w) × [0, h)`.
    pub fn clip_to(&self, w: u32, h: u32) -> Bounds {
        let x0 = self.x.clamp(0, w as i32);
        let y0 = self.y.clamp(0, h as i32);
        let x1 = self.right().clamp(0, w as i32);
        let y1 = self.bottom().clamp(0, h as i32);
        Bounds::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ============================================================================
// PREPROCESSED IMAGE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub original_width: u32,
    pub original_height: u32,
    pub vehicle_bounds: Bounds,
    pub normalized_width: u32,
    pub normalized_height: u32,
}

/// An image that passed the quality gate and carries its labels.
/// Owned by the pipeline stage processing it; dropped after extraction.
#[derive(Debug, Clone)]
pub struct VehicleImage {
    pub raster: Raster,
    pub view: VehicleView,
    pub lighting: LightingType,
    pub quality_score: f64,
    pub meta: ProcessingMetadata,
}

impl VehicleImage {
    /// The whole frame is the vehicle region; no detector crops it.
    pub fn new(raster: Raster, view: VehicleView, lighting: LightingType, quality: f64) -> Self {
        let bounds = raster.full_bounds();
        let meta = ProcessingMetadata {
            original_width: raster.width(),
            original_height: raster.height(),
            vehicle_bounds: bounds,
            normalized_width: raster.width(),
            normalized_height: raster.height(),
        };
        Self {
            raster,
            view,
            lighting,
            quality_score: quality,
            meta,
        }
    }
}

// ============================================================================
// GEOMETRIC FEATURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProportions {
    pub width_height_ratio: f64,
    pub upper_lower_ratio: f64,
    /// 0.0 when no plate-like contour was found.
    pub license_plate_ratio: f64,
}

impl Default for VehicleProportions {
    fn default() -> Self {
        Self {
            width_height_ratio: 1.0,
            upper_lower_ratio: 1.0,
            license_plate_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralKind {
    Headlight,
    Grille,
    Taillight,
    BumperLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuralElement {
    pub kind: StructuralKind,
    pub position: Point2D,
    pub size: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometricFeatures {
    pub vehicle_proportions: VehicleProportions,
    pub structural_elements: Vec<StructuralElement>,
    /// Detected landmarks followed by the four image corners.
    pub reference_points: Vec<Point2D>,
}

// ============================================================================
// LIGHT PATTERN FEATURES
// ============================================================================

pub const PATTERN_SIGNATURE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightShape {
    Rectangular,
    Round,
    Angular,
    Custom,
}

impl LightShape {
    /// Numeric code folded into the pattern signature.
    pub fn code(&self) -> f64 {
        match self {
            LightShape::Rectangular => 0.0,
            LightShape::Round => 1.0,
            LightShape::Angular => 2.0,
            LightShape::Custom => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    Headlight,
    Taillight,
    Drl,
    FogLight,
    BrakeLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightElement {
    pub position: Point2D,
    pub shape: LightShape,
    pub size: f64,
    pub intensity: f64,
    pub kind: LightType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightConfiguration {
    pub num_elements: usize,
    pub symmetry: f64,
    pub spacing: f64,
}

impl Default for LightConfiguration {
    fn default() -> Self {
        Self {
            num_elements: 0,
            symmetry: 0.5,
            spacing: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightPatternFeatures {
    pub light_elements: Vec<LightElement>,
    /// Fixed capacity, zero padded past the encoded slots.
    pub pattern_signature: [f64; PATTERN_SIGNATURE_LEN],
    pub light_configuration: LightConfiguration,
}

impl Default for LightPatternFeatures {
    fn default() -> Self {
        Self {
            light_elements: Vec::new(),
            pattern_signature: [0.0; PATTERN_SIGNATURE_LEN],
            light_configuration: LightConfiguration::default(),
        }
    }
}

// ============================================================================
// BUMPER FEATURES
// ============================================================================

pub const BUMPER_TEXTURE_LEN: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BumperFeatures {
    pub contour_signature: Vec<Point2D>,
    pub texture_features: [f64; BUMPER_TEXTURE_LEN],
    pub mounting_points: Vec<Point2D>,
    pub license_plate_area: Bounds,
}

// ============================================================================
// DAYLIGHT FEATURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub dominant_colors: Vec<Color>,
    pub histogram: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobShape {
    Round,
    Angular,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeFeature {
    pub position: Point2D,
    pub size: f64,
    pub shape: BlobShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimKind {
    Chrome,
    Molding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimTexture {
    Smooth,
    Textured,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimFeature {
    pub position: Point2D,
    pub kind: TrimKind,
    pub texture: TrimTexture,
}

pub const TEXTURE_FEATURES_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSignature {
    pub features: [f64; TEXTURE_FEATURES_LEN],
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaylightFeatures {
    pub color_profile: ColorProfile,
    pub badge_locations: Vec<BadgeFeature>,
    pub trim_details: Vec<TrimFeature>,
    pub surface_texture: TextureSignature,
}

// ============================================================================
// INFRARED FEATURES
// ============================================================================

pub const MATERIAL_SIGNATURE_LEN: usize = 6;
pub const ILLUMINATION_DIRECTIONS: usize = 4;
pub const THERMAL_SIGNATURE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LicensePlateRegion {
    pub bounds: Bounds,
    pub confidence: f64,
    pub avg_brightness: f64,
    pub is_reflective: bool,
}

/// Fingerprint of the material around (never inside) the plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRSignature {
    pub plate_region: LicensePlateRegion,
    pub surrounding_region: Bounds,
    /// Row-major grid, normally 8×8.
    pub reflectivity_map: Vec<Vec<f64>>,
    pub material_signature: [f64; MATERIAL_SIGNATURE_LEN],
    /// Top, right, bottom, left.
    pub illumination_gradient: [f64; ILLUMINATION_DIRECTIONS],
    pub shadow_patterns: Vec<Point2D>,
    pub texture_features: [f64; TEXTURE_FEATURES_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectiveElement {
    pub position: Point2D,
    pub intensity: f64,
    pub size: f64,
    pub shape: BlobShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPattern {
    pub region: Bounds,
    pub temperature: f64,
    pub gradient: [f64; ILLUMINATION_DIRECTIONS],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfraredFeatures {
    pub thermal_signature: [f64; THERMAL_SIGNATURE_LEN],
    pub reflective_elements: Vec<ReflectiveElement>,
    pub heat_patterns: Vec<HeatPattern>,
    pub material_signature: [f64; MATERIAL_SIGNATURE_LEN],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_signature: Option<IRSignature>,
}

// ============================================================================
// FEATURE SET
// ============================================================================

/// Lighting-specific block. Exactly one exists per feature set, and it
/// determines the set's lighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightingFeatures {
    #[serde(rename = "daylight_features")]
    Daylight(DaylightFeatures),
    #[serde(rename = "infrared_features")]
    Infrared(InfraredFeatures),
}

impl LightingFeatures {
    pub fn lighting(&self) -> LightingType {
        match self {
            LightingFeatures::Daylight(_) => LightingType::Daylight,
            LightingFeatures::Infrared(_) => LightingType::Infrared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleFeatures {
    pub view: VehicleView,
    pub geometric_features: GeometricFeatures,
    pub light_patterns: LightPatternFeatures,
    pub bumper_features: BumperFeatures,
    #[serde(flatten)]
    pub lighting_features: LightingFeatures,
    /// Completeness heuristic in [0, 1], not a probability.
    pub extraction_quality: f64,
}

impl VehicleFeatures {
    pub fn lighting(&self) -> LightingType {
        self.lighting_features.lighting()
    }

    pub fn daylight(&self) -> Option<&DaylightFeatures> {
        match &self.lighting_features {
            LightingFeatures::Daylight(d) => Some(d),
            LightingFeatures::Infrared(_) => None,
        }
    }

    pub fn infrared(&self) -> Option<&InfraredFeatures> {
        match &self.lighting_features {
            LightingFeatures::Infrared(ir) => Some(ir),
            LightingFeatures::Daylight(_) => None,
        }
    }
}

// ============================================================================
// COMPARISON RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedScores {
    pub geometric_similarity: f64,
    pub light_pattern_similarity: f64,
    pub bumper_similarity: f64,
    /// Daylight only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_similarity: Option<f64>,
    /// Infrared only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_similarity: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub processing_time_ms: u64,
    pub image1_quality: f64,
    pub image2_quality: f64,
    pub alignment_quality: f64,
    pub view_consistency: bool,
    pub lighting_consistency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub is_same_vehicle: bool,
    pub similarity_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub detailed_scores: DetailedScores,
    pub processing_info: ProcessingInfo,
}
