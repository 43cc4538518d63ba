//! Pattern validation: recomputes the stitch math against the original target
//! and collects errors, warnings and suggestions.

use crate::config::ConfigTables;
use crate::core::stitch::BORDER_ALLOWANCE;
use crate::domain::model::{
    DimensionValidation, Dimensions, FabricSpec, RequirementsSpec, StitchResult, ValidationReport,
};
use crate::domain::ports::Stage;
use crate::utils::error::{PipelineStage, StageResult};
use std::sync::Arc;

/// Allowed gap between target and achieved size, in inches.
pub const DIMENSION_TOLERANCE: f64 = 0.5;

const LARGE_AREA: f64 = 5000.0;
const SMALL_AREA: f64 = 50.0;
const TIGHT_GAUGE: f64 = 8.0;
const LOOSE_GAUGE: f64 = 2.0;

pub struct ValidationInput<'a> {
    pub requirements: &'a RequirementsSpec,
    pub fabric_spec: &'a FabricSpec,
    /// Receives its `dimension_validation`; must not already carry one.
    pub stitch_result: &'a mut StitchResult,
}

#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
    suggestions: Vec<String>,
}

pub struct ValidationStage {
    tables: Arc<ConfigTables>,
}

impl ValidationStage {
    pub fn new(tables: Arc<ConfigTables>) -> Self {
        Self { tables }
    }

    fn validate_dimension_accuracy(
        &self,
        target: Dimensions,
        actual: Dimensions,
    ) -> DimensionValidation {
        let width_difference = (actual.width - target.width).abs();
        let length_difference = (actual.length - target.length).abs();
        let width_accurate = width_difference <= DIMENSION_TOLERANCE;
        let length_accurate = length_difference <= DIMENSION_TOLERANCE;

        DimensionValidation {
            width_accurate,
            length_accurate,
            within_tolerance: width_accurate && length_accurate,
            width_difference: round2(width_difference),
            length_difference: round2(length_difference),
            tolerance: DIMENSION_TOLERANCE,
        }
    }

    fn validate_stitch_math(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
        stitch_result: &StitchResult,
        findings: &mut Findings,
    ) {
        let gauge = fabric_spec.gauge;
        let target = requirements.dimensions;

        let expected_width = f64::from(stitch_result.cast_on_stitches) / gauge.stitches_per_inch;
        if (expected_width - target.width).abs() > DIMENSION_TOLERANCE {
            findings.errors.push(format!(
                "Width calculation error: {} stitches will produce {:.1}\" but target is {:.1}\"",
                stitch_result.cast_on_stitches, expected_width, target.width
            ));
        }

        let expected_length = f64::from(stitch_result.total_rows) / gauge.rows_per_inch;
        if (expected_length - target.length).abs() > DIMENSION_TOLERANCE {
            findings.errors.push(format!(
                "Length calculation error: {} rows will produce {:.1}\" but target is {:.1}\"",
                stitch_result.total_rows, expected_length, target.length
            ));
        }

        if stitch_result.cast_on_stitches == 0 {
            findings
                .errors
                .push("Cast-on stitch count must be positive".to_string());
        }
        if stitch_result.total_rows == 0 {
            findings
                .errors
                .push("Total row count must be positive".to_string());
        }
    }

    fn validate_gauge_plausibility(&self, fabric_spec: &FabricSpec, findings: &mut Findings) {
        let weight = &fabric_spec.yarn_requirements.weight;
        let spi = fabric_spec.gauge.stitches_per_inch;

        if let Some(range) = self.tables.gauge_range(weight) {
            if !range.contains(spi) {
                findings.warnings.push(format!(
                    "Gauge {} sts/inch may be unusual for {} weight yarn (typical range: {}-{} sts/inch)",
                    spi, weight, range.min, range.max
                ));
            }
        }
    }

    fn validate_pattern_logic(
        &self,
        fabric_spec: &FabricSpec,
        stitch_result: &StitchResult,
        findings: &mut Findings,
    ) {
        let pattern = &fabric_spec.stitch_pattern;

        if pattern.stitch_repeat > 1 {
            let cast_on = i64::from(stitch_result.cast_on_stitches);
            let pattern_stitches = if fabric_spec.border_pattern.is_some() {
                cast_on - i64::from(BORDER_ALLOWANCE)
            } else {
                cast_on
            };

            if pattern_stitches.rem_euclid(i64::from(pattern.stitch_repeat)) != 0 {
                findings.errors.push(format!(
                    "Stitch pattern repeat ({} sts) doesn't divide evenly into pattern area ({} sts)",
                    pattern.stitch_repeat, pattern_stitches
                ));
            }
        }

        let total_rows = stitch_result.total_rows;
        if pattern.row_repeat > 1 && total_rows % pattern.row_repeat != 0 {
            findings.suggestions.push(format!(
                "Consider adjusting length so total rows ({}) is divisible by pattern repeat ({} rows) for complete pattern",
                total_rows, pattern.row_repeat
            ));
        }
    }

    fn validate_skill_level(&self, fabric_spec: &FabricSpec, findings: &mut Findings) {
        let pattern_name = &fabric_spec.stitch_pattern.name;
        let yarn_weight = &fabric_spec.yarn_requirements.weight;

        findings.warnings.extend(
            self.tables
                .skill_rules
                .iter()
                .filter(|rule| rule.applies_to(pattern_name, yarn_weight))
                .map(|rule| rule.warning.clone()),
        );
    }

    fn validate_construction_feasibility(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
        findings: &mut Findings,
    ) {
        let area = requirements.dimensions.area();
        if area > LARGE_AREA {
            findings.warnings.push(format!(
                "Large project ({:.0} sq in) - consider breaking into panels or using lighter weight yarn",
                area
            ));
        }
        if area < SMALL_AREA {
            findings.warnings.push(format!(
                "Small project ({:.0} sq in) - verify dimensions are correct",
                area
            ));
        }

        let mentions_blocking = fabric_spec
            .construction_notes
            .iter()
            .any(|note| note.to_lowercase().contains("block"));
        if mentions_blocking && fabric_spec.yarn_requirements.weight == "chunky" {
            findings.suggestions.push(
                "Blocking may be less effective with chunky yarn - consider steam blocking or wet blocking techniques"
                    .to_string(),
            );
        }

        let spi = fabric_spec.gauge.stitches_per_inch;
        if spi > TIGHT_GAUGE {
            findings.suggestions.push(
                "Very tight gauge - ensure needle size recommendations allow for comfortable knitting"
                    .to_string(),
            );
        } else if spi < LOOSE_GAUGE {
            findings.suggestions.push(
                "Very loose gauge - pattern may lack structure, consider smaller needles"
                    .to_string(),
            );
        }
    }
}

impl<'a> Stage<'a> for ValidationStage {
    type Input = ValidationInput<'a>;
    type Output = ValidationReport;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Validation
    }

    fn agent(&self) -> &'static str {
        "pattern_validator"
    }

    fn process(&self, input: ValidationInput<'a>) -> StageResult<ValidationReport> {
        let ValidationInput {
            requirements,
            fabric_spec,
            stitch_result,
        } = input;

        let dimension_validation = self
            .validate_dimension_accuracy(requirements.dimensions, stitch_result.actual_dimensions);
        stitch_result.attach_dimension_validation(dimension_validation)?;

        let mut findings = Findings::default();
        self.validate_stitch_math(requirements, fabric_spec, stitch_result, &mut findings);
        self.validate_gauge_plausibility(fabric_spec, &mut findings);
        self.validate_pattern_logic(fabric_spec, stitch_result, &mut findings);
        self.validate_skill_level(fabric_spec, &mut findings);
        self.validate_construction_feasibility(requirements, fabric_spec, &mut findings);

        for error in &findings.errors {
            tracing::warn!("Pattern check failed: {}", error);
        }
        tracing::debug!(
            "Validation found {} errors, {} warnings, {} suggestions",
            findings.errors.len(),
            findings.warnings.len(),
            findings.suggestions.len()
        );

        Ok(ValidationReport::new(
            findings.errors,
            findings.warnings,
            findings.suggestions,
        ))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stages::fabric::{seed_stitch_border, simple_cable, simple_lace, stockinette};
    use crate::domain::model::{Gauge, ProjectType, StitchPattern, YarnSpec};
    use crate::utils::error::StageError;
    use std::collections::BTreeMap;

    fn requirements(width: f64, length: f64) -> RequirementsSpec {
        RequirementsSpec {
            project_type: ProjectType::Blanket,
            dimensions: Dimensions::new(width, length),
            style_preferences: BTreeMap::new(),
            special_requirements: vec![],
        }
    }

    fn fabric(main: StitchPattern, weight: &str, gauge: Gauge) -> FabricSpec {
        FabricSpec {
            stitch_pattern: main,
            border_pattern: Some(seed_stitch_border()),
            yarn_requirements: YarnSpec {
                weight: weight.to_string(),
                fiber: "wool".to_string(),
                color: None,
            },
            gauge,
            construction_notes: vec![],
        }
    }

    fn stitch_result(cast_on: u32, rows: u32, gauge: Gauge) -> StitchResult {
        StitchResult {
            cast_on_stitches: cast_on,
            total_rows: rows,
            actual_dimensions: Dimensions::new(
                round2(f64::from(cast_on) / gauge.stitches_per_inch),
                round2(f64::from(rows) / gauge.rows_per_inch),
            ),
            stitch_instructions: vec![],
            dimension_validation: None,
        }
    }

    fn validate(
        req: &RequirementsSpec,
        fabric_spec: &FabricSpec,
        result: &mut StitchResult,
    ) -> StageResult<ValidationReport> {
        ValidationStage::new(Arc::new(ConfigTables::default())).process(ValidationInput {
            requirements: req,
            fabric_spec,
            stitch_result: result,
        })
    }

    #[test]
    fn test_repeat_that_does_not_divide_is_an_error() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let f = fabric(simple_cable(), "worsted", gauge);
        let mut result = stitch_result(199, 328, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(!report.is_valid());
        assert!(report.errors().iter().any(|e| e
            == "Stitch pattern repeat (12 sts) doesn't divide evenly into pattern area (191 sts)"));
    }

    #[test]
    fn test_width_off_by_an_inch_is_an_error() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let f = fabric(stockinette(), "worsted", gauge);
        let mut result = stitch_result(196, 330, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        let dims = result.dimension_validation.as_ref().unwrap();

        assert!(!dims.width_accurate);
        assert!(dims.length_accurate);
        assert!(!dims.within_tolerance);
        assert_eq!(dims.width_difference, 1.0);
        assert_eq!(
            report.errors(),
            ["Width calculation error: 196 stitches will produce 49.0\" but target is 48.0\""]
        );
    }

    #[test]
    fn test_border_allowance_counts_against_width() {
        // 192 + 8 border stitches = 50", outside tolerance of the 48" target
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let f = fabric(stockinette(), "worsted", gauge);
        let mut result = stitch_result(200, 330, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.errors().len(), 1);
        assert!(report.warnings().is_empty());
        assert!(report.suggestions().is_empty());
    }

    #[test]
    fn test_clean_pattern_is_valid() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let mut f = fabric(stockinette(), "worsted", gauge);
        f.border_pattern = None;
        let mut result = stitch_result(192, 330, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(report.is_valid());
        assert!(result.dimension_validation.unwrap().within_tolerance);
    }

    #[test]
    fn test_gauge_and_skill_warnings_do_not_invalidate() {
        let gauge = Gauge::new(5.0, 7.0);
        let req = requirements(48.0, 60.0);
        let mut f = fabric(simple_lace(), "fingering", gauge);
        f.border_pattern = None;
        let mut result = stitch_result(240, 420, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.warnings().len(), 2);
        assert!(report.warnings()[0].starts_with("Gauge 5 sts/inch may be unusual for fingering"));
        assert!(report.warnings()[1].starts_with("Fingering weight yarn"));
    }

    #[test]
    fn test_row_repeat_mismatch_is_only_a_suggestion() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let mut f = fabric(simple_cable(), "worsted", gauge);
        f.border_pattern = None;
        let mut result = stitch_result(192, 330, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(report.is_valid());
        assert_eq!(
            report.suggestions(),
            ["Consider adjusting length so total rows (330) is divisible by pattern repeat (8 rows) for complete pattern"]
        );
    }

    #[test]
    fn test_scale_and_gauge_extremes() {
        let gauge = Gauge::new(9.0, 12.0);
        let req = requirements(80.0, 80.0);
        let mut f = fabric(stockinette(), "chunky", gauge);
        f.border_pattern = None;
        f.construction_notes = vec!["Block finished piece".to_string()];
        let mut result = stitch_result(720, 960, gauge);

        let report = validate(&req, &f, &mut result).unwrap();
        assert!(report.is_valid());
        assert!(report
            .warnings()
            .iter()
            .any(|w| w.starts_with("Large project (6400 sq in)")));
        assert!(report.suggestions().iter().any(|s| s.starts_with("Blocking may be less effective")));
        assert!(report.suggestions().iter().any(|s| s.starts_with("Very tight gauge")));
    }

    #[test]
    fn test_second_validation_of_same_result_is_rejected() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let f = fabric(stockinette(), "worsted", gauge);
        let mut result = stitch_result(200, 330, gauge);

        validate(&req, &f, &mut result).unwrap();
        let err = validate(&req, &f, &mut result).unwrap_err();
        assert!(matches!(err, StageError::InvalidInput { .. }));
    }

    #[test]
    fn test_validation_is_idempotent_on_fresh_results() {
        let gauge = Gauge::new(4.0, 5.5);
        let req = requirements(48.0, 60.0);
        let f = fabric(simple_cable(), "worsted", gauge);

        let mut first = stitch_result(199, 330, gauge);
        let mut second = stitch_result(199, 330, gauge);
        let a = validate(&req, &f, &mut first).unwrap();
        let b = validate(&req, &f, &mut second).unwrap();

        assert_eq!(a, b);
        assert_eq!(first, second);
    }
}
