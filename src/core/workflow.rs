use crate::app::stages::{
    ConstructionInput, ConstructionStage, FabricInput, FabricStage, OutputInput, OutputStage,
    RequirementsInput, RequirementsStage,
};
use crate::config::ConfigTables;
use crate::core::stitch::{StitchInput, StitchStage};
use crate::core::validator::{ValidationInput, ValidationStage};
use crate::domain::model::{
    DimensionAccuracy, DimensionValidation, FabricSpec, PatternArtifact, PatternMaterials,
    PatternSummary, RequirementsSpec, StitchResult, ValidationReport, ValidationStatus,
};
use crate::domain::ports::Stage;
use crate::utils::error::{PatternError, PipelineStage, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Runs the six stages in order and assembles the artifact.
///
/// The workflow holds no per-run state, so one instance can serve many
/// threads; the tables are shared read-only.
pub struct PatternWorkflow {
    tables: Arc<ConfigTables>,
    requirements: RequirementsStage,
    fabric: FabricStage,
    construction: ConstructionStage,
    stitch: StitchStage,
    validation: ValidationStage,
    output: OutputStage,
}

impl PatternWorkflow {
    pub fn new(tables: Arc<ConfigTables>) -> Self {
        Self {
            requirements: RequirementsStage::new(Arc::clone(&tables)),
            fabric: FabricStage::new(Arc::clone(&tables)),
            construction: ConstructionStage::new(),
            stitch: StitchStage::new(),
            validation: ValidationStage::new(Arc::clone(&tables)),
            output: OutputStage::new(Arc::clone(&tables)),
            tables,
        }
    }

    pub fn tables(&self) -> &ConfigTables {
        &self.tables
    }

    pub fn generate(&self, user_request: &str) -> Result<PatternArtifact> {
        self.generate_at(user_request, Utc::now())
    }

    /// Same as [`generate`](Self::generate) with a fixed generation timestamp.
    pub fn generate_at(
        &self,
        user_request: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<PatternArtifact> {
        if user_request.trim().is_empty() {
            tracing::error!("❌ Rejected empty pattern request");
            return Err(PatternError::Orchestration {
                failed_stage: PipelineStage::InputValidation,
                agent: None,
                message: "Invalid user request: must be a non-empty string".to_string(),
                source: None,
            });
        }

        tracing::info!("🧶 Generating pattern for request: {:?}", user_request);
        let started = Instant::now();

        let requirements = run_stage(
            &self.requirements,
            RequirementsInput { user_request },
            "Requirements processing failed",
        )?;

        let fabric_spec = run_stage(
            &self.fabric,
            FabricInput {
                requirements: &requirements,
            },
            "Fabric specification failed",
        )?;

        let construction_spec = run_stage(
            &self.construction,
            ConstructionInput {
                requirements: &requirements,
                fabric_spec: &fabric_spec,
            },
            "Construction planning failed",
        )?;

        let mut stitch_result = run_stage(
            &self.stitch,
            StitchInput {
                fabric_spec: &fabric_spec,
                construction_spec: &construction_spec,
            },
            "Stitch calculations failed",
        )?;

        let validation = run_stage(
            &self.validation,
            ValidationInput {
                requirements: &requirements,
                fabric_spec: &fabric_spec,
                stitch_result: &mut stitch_result,
            },
            "Pattern validation failed",
        )?;

        let outputs = run_stage(
            &self.output,
            OutputInput {
                requirements: &requirements,
                fabric_spec: &fabric_spec,
                stitch_result: &stitch_result,
                validation: &validation,
                generated_at,
            },
            "Output generation failed",
        )?;

        let dimension_validation =
            stitch_result
                .dimension_validation
                .as_ref()
                .ok_or_else(|| PatternError::Orchestration {
                    failed_stage: PipelineStage::Validation,
                    agent: Some(self.validation.agent()),
                    message: "Validation did not record dimension accuracy".to_string(),
                    source: None,
                })?;
        let pattern_summary = self.build_pattern_summary(
            &requirements,
            &fabric_spec,
            &stitch_result,
            dimension_validation,
            &validation,
        );

        if validation.is_valid() {
            tracing::info!(
                "✅ Pattern generated in {:?}: {}",
                started.elapsed(),
                pattern_summary.title
            );
        } else {
            tracing::warn!(
                "⚠️ Pattern generated in {:?} with {} validation errors: {}",
                started.elapsed(),
                validation.errors().len(),
                pattern_summary.title
            );
        }

        Ok(PatternArtifact {
            user_request: user_request.to_string(),
            requirements,
            fabric_spec,
            construction_spec,
            stitch_result,
            validation,
            outputs,
            pattern_summary,
        })
    }

    fn build_pattern_summary(
        &self,
        requirements: &RequirementsSpec,
        fabric_spec: &FabricSpec,
        stitch_result: &StitchResult,
        dimension_validation: &DimensionValidation,
        validation: &ValidationReport,
    ) -> PatternSummary {
        let yarn = &fabric_spec.yarn_requirements;
        let actual = stitch_result.actual_dimensions;
        let project_type = requirements.project_type.title();
        let yardage = self
            .tables
            .estimated_yardage(requirements.dimensions.area(), &yarn.weight);

        PatternSummary {
            title: format!("{} {} ({})", fabric_spec.stitch_pattern.name, project_type, actual),
            project_type: project_type.to_string(),
            finished_size: format!("{}\" wide x {}\" long", actual.width, actual.length),
            materials: PatternMaterials {
                yarn: format!("{} yards {} weight {} yarn", yardage, yarn.weight, yarn.fiber),
                needles: self.tables.needle_size(&yarn.weight).to_string(),
                gauge: format!(
                    "{} sts and {} rows = 1 inch",
                    fabric_spec.gauge.stitches_per_inch, fabric_spec.gauge.rows_per_inch
                ),
            },
            cast_on_stitches: stitch_result.cast_on_stitches,
            total_rows: stitch_result.total_rows,
            main_pattern: fabric_spec.stitch_pattern.name.clone(),
            border_pattern: fabric_spec.border_pattern.as_ref().map(|b| b.name.clone()),
            construction_notes: fabric_spec.construction_notes.clone(),
            dimension_accuracy: DimensionAccuracy {
                target_size: requirements.dimensions.to_string(),
                actual_size: actual.to_string(),
                within_tolerance: dimension_validation.within_tolerance,
                differences: format!(
                    "Width: ±{}\", Length: ±{}\"",
                    dimension_validation.width_difference, dimension_validation.length_difference
                ),
            },
            validation_status: ValidationStatus {
                is_valid: validation.is_valid(),
                error_count: validation.errors().len(),
                warning_count: validation.warnings().len(),
                suggestion_count: validation.suggestions().len(),
            },
        }
    }
}

/// Runs one stage, timing it and wrapping any failure with the stage tag.
fn run_stage<'a, S: Stage<'a>>(stage: &S, input: S::Input, failure: &str) -> Result<S::Output> {
    let started = Instant::now();
    tracing::debug!("▶️ Running {} stage ({})", stage.kind(), stage.agent());

    match stage.process(input) {
        Ok(output) => {
            tracing::info!(
                stage = stage.kind().as_str(),
                agent = stage.agent(),
                "✅ {} stage completed in {:?}",
                stage.kind(),
                started.elapsed()
            );
            Ok(output)
        }
        Err(e) => {
            tracing::error!(
                stage = stage.kind().as_str(),
                agent = stage.agent(),
                "❌ {}: {}",
                failure,
                e
            );
            Err(PatternError::Orchestration {
                failed_stage: stage.kind(),
                agent: Some(stage.agent()),
                message: format!("{}: {}", failure, e),
                source: Some(e),
            })
        }
    }
}
