use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::error::{StageError, StageResult};

pub const BORDER_ZONE: &str = "border";
pub const MAIN_BODY_ZONE: &str = "main_body";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Blanket,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Blanket => "blanket",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProjectType::Blanket => "Blanket",
        }
    }
}

/// Texture tag carried in `style_preferences["texture"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    Simple,
    Cable,
    Lace,
}

impl Texture {
    pub const KEY: &'static str = "texture";

    pub fn as_str(&self) -> &'static str {
        match self {
            Texture::Simple => "simple",
            Texture::Cable => "cable",
            Texture::Lace => "lace",
        }
    }
}

impl std::str::FromStr for Texture {
    type Err = StageError;

    fn from_str(s: &str) -> StageResult<Self> {
        match s {
            "simple" => Ok(Texture::Simple),
            "cable" => Ok(Texture::Cable),
            "lace" => Ok(Texture::Lace),
            other => Err(StageError::InvalidInput {
                field: "style_preferences.texture".to_string(),
                expected: "one of simple, cable, lace".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Physical size in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub length: f64,
}

impl Dimensions {
    pub fn new(width: f64, length: f64) -> Self {
        Self { width, length }
    }

    pub fn area(&self) -> f64 {
        self.width * self.length
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\" x {}\"", self.width, self.length)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsSpec {
    pub project_type: ProjectType,
    pub dimensions: Dimensions,
    pub style_preferences: BTreeMap<String, String>,
    pub special_requirements: Vec<String>,
}

impl RequirementsSpec {
    pub fn texture(&self) -> StageResult<Texture> {
        self.style_preferences
            .get(Texture::KEY)
            .map(String::as_str)
            .unwrap_or(Texture::Simple.as_str())
            .parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchPattern {
    pub name: String,
    pub row_repeat: u32,
    pub stitch_repeat: u32,
    pub instructions: Vec<String>,
}

impl StitchPattern {
    pub fn new(name: &str, row_repeat: u32, stitch_repeat: u32, instructions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            row_repeat,
            stitch_repeat,
            instructions: instructions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YarnSpec {
    pub weight: String,
    pub fiber: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub stitches_per_inch: f64,
    pub rows_per_inch: f64,
}

impl Gauge {
    pub fn new(stitches_per_inch: f64, rows_per_inch: f64) -> Self {
        Self {
            stitches_per_inch,
            rows_per_inch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricSpec {
    pub stitch_pattern: StitchPattern,
    pub border_pattern: Option<StitchPattern>,
    pub yarn_requirements: YarnSpec,
    pub gauge: Gauge,
    pub construction_notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativePosition {
    Perimeter,
    Center,
    Top,
    Bottom,
    Sides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionZone {
    pub name: String,
    pub stitch_pattern: StitchPattern,
    pub relative_position: RelativePosition,
    pub priority: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionStep {
    CastOn,
    BottomBorder,
    MainBody,
    MainBodyWithSideBorders,
    TopBorder,
    BindOff,
    Finishing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishingStep {
    WeaveInEnds,
    Blocking,
    CableBlocking,
    AggressiveBlocking,
}

impl FinishingStep {
    pub fn instruction(&self) -> &'static str {
        match self {
            FinishingStep::WeaveInEnds => "Weave in all loose ends securely",
            FinishingStep::Blocking => "Block piece to measurements, allowing to dry completely",
            FinishingStep::CableBlocking => "Block gently to maintain cable definition",
            FinishingStep::AggressiveBlocking => "Block aggressively to open up lace pattern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSpec {
    pub target_dimensions: Dimensions,
    pub construction_zones: Vec<ConstructionZone>,
    pub construction_sequence: Vec<ConstructionStep>,
    pub finishing_requirements: Vec<FinishingStep>,
    pub structural_notes: Vec<String>,
}

impl ConstructionSpec {
    pub fn zone(&self, name: &str) -> Option<&ConstructionZone> {
        self.construction_zones.iter().find(|z| z.name == name)
    }

    pub fn has_zone(&self, name: &str) -> bool {
        self.zone(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValidation {
    pub width_accurate: bool,
    pub length_accurate: bool,
    pub within_tolerance: bool,
    pub width_difference: f64,
    pub length_difference: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchResult {
    pub cast_on_stitches: u32,
    pub total_rows: u32,
    pub actual_dimensions: Dimensions,
    pub stitch_instructions: Vec<String>,
    /// Left empty by the stitch engine; written once by pattern validation.
    pub dimension_validation: Option<DimensionValidation>,
}

impl StitchResult {
    pub(crate) fn attach_dimension_validation(
        &mut self,
        validation: DimensionValidation,
    ) -> StageResult<()> {
        if self.dimension_validation.is_some() {
            return Err(StageError::InvalidInput {
                field: "stitch_result.dimension_validation".to_string(),
                expected: "an unvalidated stitch result".to_string(),
                value: "already validated".to_string(),
            });
        }
        self.dimension_validation = Some(validation);
        Ok(())
    }
}

/// Findings of pattern validation. `is_valid` is fixed at construction from
/// whether any errors were recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn new(errors: Vec<String>, warnings: Vec<String>, suggestions: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMaterials {
    pub yarn: String,
    pub needles: String,
    pub gauge: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionAccuracy {
    pub target_size: String,
    pub actual_size: String,
    pub within_tolerance: bool,
    pub differences: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationStatus {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub suggestion_count: usize,
}

/// Human-facing projection over already-computed pipeline data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub title: String,
    pub project_type: String,
    pub finished_size: String,
    pub materials: PatternMaterials,
    pub cast_on_stitches: u32,
    pub total_rows: u32,
    pub main_pattern: String,
    pub border_pattern: Option<String>,
    pub construction_notes: Vec<String>,
    pub dimension_accuracy: DimensionAccuracy,
    pub validation_status: ValidationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    pub size: String,
    pub yarn_needed: String,
    pub estimated_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSummary {
    pub title: String,
    pub quick_stats: QuickStats,
    pub key_techniques: Vec<String>,
    pub warnings_count: usize,
    pub suggestions_count: usize,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedOutputs {
    pub markdown: String,
    pub text: String,
    pub json: serde_json::Value,
    pub summary: OutputSummary,
}

/// Everything one successful `generate` run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternArtifact {
    pub user_request: String,
    pub requirements: RequirementsSpec,
    pub fabric_spec: FabricSpec,
    pub construction_spec: ConstructionSpec,
    pub stitch_result: StitchResult,
    pub validation: ValidationReport,
    pub outputs: RenderedOutputs,
    pub pattern_summary: PatternSummary,
}
