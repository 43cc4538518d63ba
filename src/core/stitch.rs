//! Stitch engine: turns target size, gauge and repeat constraints into whole
//! stitch and row counts plus the written instruction sequence.

use crate::domain::model::{
    ConstructionSpec, ConstructionStep, Dimensions, FabricSpec, StitchPattern, StitchResult,
    BORDER_ZONE, MAIN_BODY_ZONE,
};
use crate::domain::ports::Stage;
use crate::utils::error::{CalculationPhase, PipelineStage, StageError, StageResult};

/// Extra cast-on stitches for a border zone, 4 per side. Independent of the
/// border pattern's own repeat.
pub const BORDER_ALLOWANCE: u32 = 8;

/// Largest believable finished dimension, in inches.
const MAX_ACTUAL_DIMENSION: f64 = 1000.0;

pub struct StitchInput<'a> {
    pub fabric_spec: &'a FabricSpec,
    pub construction_spec: &'a ConstructionSpec,
}

#[derive(Debug, Default)]
pub struct StitchStage;

impl StitchStage {
    pub fn new() -> Self {
        Self
    }

    fn validate_calculation_inputs(
        &self,
        fabric_spec: &FabricSpec,
        construction_spec: &ConstructionSpec,
    ) -> StageResult<()> {
        let gauge = fabric_spec.gauge;
        if !(gauge.stitches_per_inch > 0.0 && gauge.rows_per_inch > 0.0)
            || !gauge.stitches_per_inch.is_finite()
            || !gauge.rows_per_inch.is_finite()
        {
            return Err(StageError::calculation(
                CalculationPhase::GaugeValidation,
                format!(
                    "Invalid gauge values: {} stitches/inch, {} rows/inch",
                    gauge.stitches_per_inch, gauge.rows_per_inch
                ),
            ));
        }

        let target = construction_spec.target_dimensions;
        if !(target.width > 0.0 && target.length > 0.0) {
            return Err(StageError::calculation(
                CalculationPhase::DimensionValidation,
                format!("Invalid target dimensions: {}", target),
            ));
        }

        if construction_spec.construction_zones.is_empty() {
            return Err(StageError::calculation(
                CalculationPhase::ConstructionValidation,
                "No construction zones defined",
            ));
        }

        if construction_spec.construction_sequence.is_empty() {
            return Err(StageError::calculation(
                CalculationPhase::ConstructionValidation,
                "No construction sequence defined",
            ));
        }

        for zone in &construction_spec.construction_zones {
            if zone.name.trim().is_empty() {
                return Err(StageError::calculation(
                    CalculationPhase::ConstructionValidation,
                    "Construction zone missing name",
                ));
            }
            if zone.stitch_pattern.stitch_repeat == 0 || zone.stitch_pattern.row_repeat == 0 {
                return Err(StageError::calculation(
                    CalculationPhase::PatternRepeat,
                    format!(
                        "Invalid repeat in zone '{}': stitch_repeat={}, row_repeat={}",
                        zone.name,
                        zone.stitch_pattern.stitch_repeat,
                        zone.stitch_pattern.row_repeat
                    ),
                ));
            }
        }

        Ok(())
    }

    fn calculate_cast_on_stitches(
        &self,
        fabric_spec: &FabricSpec,
        construction_spec: &ConstructionSpec,
    ) -> StageResult<u32> {
        let target_width = construction_spec.target_dimensions.width;
        let stitches_per_inch = fabric_spec.gauge.stitches_per_inch;
        let base = base_count(target_width, stitches_per_inch);

        if base == 0 {
            return Err(StageError::calculation(
                CalculationPhase::CastOnStitches,
                format!(
                    "Invalid base stitch calculation: {} (width={}, gauge={})",
                    base, target_width, stitches_per_inch
                ),
            ));
        }

        let repeat = construction_spec
            .zone(MAIN_BODY_ZONE)
            .map(|z| z.stitch_pattern.stitch_repeat);
        let pattern_stitches = round_up_to_repeat(base, repeat, CalculationPhase::CastOnStitches)?;

        let border_stitches = if construction_spec.has_zone(BORDER_ZONE) {
            BORDER_ALLOWANCE
        } else {
            0
        };

        pattern_stitches
            .checked_add(border_stitches)
            .filter(|total| *total > 0)
            .ok_or_else(|| {
                StageError::calculation(
                    CalculationPhase::CastOnStitches,
                    format!(
                        "Invalid total stitch count: {} + {}",
                        pattern_stitches, border_stitches
                    ),
                )
            })
    }

    fn calculate_total_rows(
        &self,
        fabric_spec: &FabricSpec,
        construction_spec: &ConstructionSpec,
    ) -> StageResult<u32> {
        let target_length = construction_spec.target_dimensions.length;
        let rows_per_inch = fabric_spec.gauge.rows_per_inch;
        let base = base_count(target_length, rows_per_inch);

        if base == 0 {
            return Err(StageError::calculation(
                CalculationPhase::TotalRows,
                format!(
                    "Invalid base row calculation: {} (length={}, gauge={})",
                    base, target_length, rows_per_inch
                ),
            ));
        }

        let repeat = construction_spec
            .zone(MAIN_BODY_ZONE)
            .map(|z| z.stitch_pattern.row_repeat);
        round_up_to_repeat(base, repeat, CalculationPhase::TotalRows)
    }

    fn generate_stitch_instructions(
        &self,
        construction_spec: &ConstructionSpec,
        cast_on_stitches: u32,
    ) -> Vec<String> {
        let mut instructions = vec![format!("Cast on {} stitches", cast_on_stitches)];

        for step in &construction_spec.construction_sequence {
            match step {
                ConstructionStep::CastOn => {}
                ConstructionStep::BottomBorder => {
                    if let Some(zone) = construction_spec.zone(BORDER_ZONE) {
                        instructions.extend(border_instructions(&zone.stitch_pattern));
                    }
                }
                ConstructionStep::MainBody | ConstructionStep::MainBodyWithSideBorders => {
                    if let Some(zone) = construction_spec.zone(MAIN_BODY_ZONE) {
                        instructions.extend(main_pattern_instructions(&zone.stitch_pattern));
                    }
                }
                ConstructionStep::TopBorder => {
                    if construction_spec.has_zone(BORDER_ZONE) {
                        instructions.push("Repeat border pattern as at beginning".to_string());
                    }
                }
                ConstructionStep::BindOff => {
                    instructions.push("Bind off all stitches loosely".to_string());
                }
                ConstructionStep::Finishing => {
                    instructions.extend(
                        construction_spec
                            .finishing_requirements
                            .iter()
                            .map(|f| f.instruction().to_string()),
                    );
                }
            }
        }

        instructions
    }

    fn calculate_actual_dimensions(
        &self,
        fabric_spec: &FabricSpec,
        cast_on_stitches: u32,
        total_rows: u32,
    ) -> Dimensions {
        Dimensions::new(
            round2(f64::from(cast_on_stitches) / fabric_spec.gauge.stitches_per_inch),
            round2(f64::from(total_rows) / fabric_spec.gauge.rows_per_inch),
        )
    }

    fn validate_calculated_dimensions(&self, actual: Dimensions) -> StageResult<()> {
        if !(actual.width > 0.0 && actual.length > 0.0) {
            return Err(StageError::calculation(
                CalculationPhase::DimensionValidation,
                format!("Calculated invalid dimensions: {}", actual),
            ));
        }
        if actual.width > MAX_ACTUAL_DIMENSION || actual.length > MAX_ACTUAL_DIMENSION {
            return Err(StageError::calculation(
                CalculationPhase::DimensionValidation,
                format!(
                    "Calculated dimensions too large: {}. Likely calculation error.",
                    actual
                ),
            ));
        }
        Ok(())
    }
}

impl<'a> Stage<'a> for StitchStage {
    type Input = StitchInput<'a>;
    type Output = StitchResult;

    fn kind(&self) -> PipelineStage {
        PipelineStage::Stitch
    }

    fn agent(&self) -> &'static str {
        "stitch_calculator"
    }

    fn process(&self, input: StitchInput<'a>) -> StageResult<StitchResult> {
        let StitchInput {
            fabric_spec,
            construction_spec,
        } = input;

        self.validate_calculation_inputs(fabric_spec, construction_spec)?;

        let cast_on_stitches = self.calculate_cast_on_stitches(fabric_spec, construction_spec)?;
        let total_rows = self.calculate_total_rows(fabric_spec, construction_spec)?;
        let stitch_instructions =
            self.generate_stitch_instructions(construction_spec, cast_on_stitches);
        let actual_dimensions =
            self.calculate_actual_dimensions(fabric_spec, cast_on_stitches, total_rows);

        self.validate_calculated_dimensions(actual_dimensions)?;

        tracing::debug!(
            "Calculated {} stitches x {} rows -> {}",
            cast_on_stitches,
            total_rows,
            actual_dimensions
        );

        Ok(StitchResult {
            cast_on_stitches,
            total_rows,
            actual_dimensions,
            stitch_instructions,
            dimension_validation: None,
        })
    }
}

/// `floor(inches * per_inch)`, saturating into `u32`.
fn base_count(inches: f64, per_inch: f64) -> u32 {
    let raw = (inches * per_inch).floor();
    if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else if raw > 0.0 {
        raw as u32
    } else {
        0
    }
}

/// Rounds `base` up to the next multiple of `repeat` when the repeat is
/// greater than one.
fn round_up_to_repeat(
    base: u32,
    repeat: Option<u32>,
    phase: CalculationPhase,
) -> StageResult<u32> {
    match repeat {
        Some(0) => Err(StageError::calculation(
            CalculationPhase::PatternRepeat,
            "Invalid pattern repeat: 0",
        )),
        Some(r) if r > 1 => base
            .div_ceil(r)
            .checked_mul(r)
            .ok_or_else(|| {
                StageError::calculation(phase, format!("Count overflow rounding {} to repeat {}", base, r))
            }),
        _ => Ok(base),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn border_instructions(pattern: &StitchPattern) -> Vec<String> {
    let mut lines: Vec<String> = pattern
        .instructions
        .iter()
        .map(|row| format!("Border {}", row))
        .collect();
    lines.push(format!(
        "Repeat border rows 1-{} for {} total rows",
        pattern.row_repeat, pattern.row_repeat
    ));
    lines
}

fn main_pattern_instructions(pattern: &StitchPattern) -> Vec<String> {
    let mut lines = vec![format!("Begin {} pattern:", pattern.name)];
    lines.extend(pattern.instructions.iter().cloned());
    lines.push(format!(
        "Repeat rows 1-{} until piece measures desired length",
        pattern.row_repeat
    ));
    lines
}
