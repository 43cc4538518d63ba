use serde::Serialize;
use thiserror::Error;

/// Pipeline stages in execution order, plus the pre-flight request check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    InputValidation,
    Requirements,
    Fabric,
    Construction,
    Stitch,
    Validation,
    Output,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::InputValidation => "input_validation",
            PipelineStage::Requirements => "requirements",
            PipelineStage::Fabric => "fabric",
            PipelineStage::Construction => "construction",
            PipelineStage::Stitch => "stitch",
            PipelineStage::Validation => "validation",
            PipelineStage::Output => "output",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the stitch arithmetic rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationPhase {
    CastOnStitches,
    TotalRows,
    PatternRepeat,
    GaugeValidation,
    ConstructionValidation,
    DimensionValidation,
}

impl CalculationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationPhase::CastOnStitches => "cast_on_stitches",
            CalculationPhase::TotalRows => "total_rows",
            CalculationPhase::PatternRepeat => "pattern_repeat",
            CalculationPhase::GaugeValidation => "gauge_validation",
            CalculationPhase::ConstructionValidation => "construction_validation",
            CalculationPhase::DimensionValidation => "dimension_validation",
        }
    }
}

impl std::fmt::Display for CalculationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised inside a single stage. Always surfaces to the caller as the
/// `source` of a [`PatternError::Orchestration`].
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Invalid input for '{field}': expected {expected}, got {value}")]
    InvalidInput {
        field: String,
        expected: String,
        value: String,
    },

    #[error("Requirements parsing error: {message}")]
    Requirements { message: String },

    #[error("Fabric specification error: {message}")]
    Fabric { message: String },

    #[error("Gauge error for yarn weight '{yarn_weight}': {message}")]
    Gauge { yarn_weight: String, message: String },

    #[error("Construction planning error ({construction_type}): {message}")]
    Construction {
        construction_type: String,
        message: String,
    },

    #[error("Stitch calculation error ({phase}): {message}")]
    Calculation {
        phase: CalculationPhase,
        message: String,
    },

    #[error("Output generation error ({format}): {message}")]
    Output { format: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StageError {
    pub(crate) fn calculation(phase: CalculationPhase, message: impl Into<String>) -> Self {
        StageError::Calculation {
            phase,
            message: message.into(),
        }
    }

    pub(crate) fn construction(construction_type: &str, message: impl Into<String>) -> Self {
        StageError::Construction {
            construction_type: construction_type.to_string(),
            message: message.into(),
        }
    }

    /// The calculation phase tag, when this is an arithmetic failure.
    pub fn phase(&self) -> Option<CalculationPhase> {
        match self {
            StageError::Calculation { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("{failed_stage} stage failed: {message}")]
    Orchestration {
        failed_stage: PipelineStage,
        agent: Option<&'static str>,
        message: String,
        #[source]
        source: Option<StageError>,
    },

    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatternError {
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        PatternError::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stage that aborted the run, if the failure came from the pipeline.
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            PatternError::Orchestration { failed_stage, .. } => Some(*failed_stage),
            _ => None,
        }
    }

    /// The underlying stage failure, if any.
    pub fn stage_cause(&self) -> Option<&StageError> {
        match self {
            PatternError::Orchestration { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PatternError::Orchestration {
                failed_stage,
                message,
                source: Some(cause),
                ..
            } => format!("Pattern generation failed at the {failed_stage} stage: {message} ({cause})"),
            PatternError::Orchestration {
                failed_stage,
                message,
                source: None,
                ..
            } => format!("Pattern generation failed at the {failed_stage} stage: {message}"),
            PatternError::Config { field, message } => {
                format!("Configuration tables are invalid ({field}): {message}")
            }
            PatternError::Io(e) => format!("Could not read input: {e}"),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PatternError::Orchestration { failed_stage, .. } => match failed_stage {
                PipelineStage::InputValidation | PipelineStage::Requirements => {
                    "Describe the project in a non-empty request, e.g. \"a cozy cable blanket\""
                }
                PipelineStage::Fabric => {
                    "Check that the configured yarn weight has a gauge entry with positive values"
                }
                PipelineStage::Construction => "Check the stitch patterns chosen for the project",
                PipelineStage::Stitch => {
                    "Check the gauge, pattern repeats and target dimensions in the configuration"
                }
                PipelineStage::Validation | PipelineStage::Output => {
                    "This is likely a bug; rerun with --verbose and report the log"
                }
            },
            PatternError::Config { .. } => {
                "Fix the reported field in the tables file or drop --config to use the defaults"
            }
            PatternError::Io(_) => "Check that the file exists and is readable",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            PatternError::Orchestration { failed_stage, .. } => match failed_stage {
                PipelineStage::InputValidation | PipelineStage::Requirements => 2,
                _ => 1,
            },
            PatternError::Config { .. } | PatternError::Io(_) => 3,
        }
    }
}

pub type StageResult<T> = std::result::Result<T, StageError>;
pub type Result<T> = std::result::Result<T, PatternError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_orchestration_error_keeps_cause() {
        let err = PatternError::Orchestration {
            failed_stage: PipelineStage::Stitch,
            agent: Some("stitch_calculator"),
            message: "Stitch calculations failed".to_string(),
            source: Some(StageError::calculation(
                CalculationPhase::GaugeValidation,
                "Invalid gauge values",
            )),
        };

        assert_eq!(err.failed_stage(), Some(PipelineStage::Stitch));
        assert_eq!(
            err.stage_cause().and_then(|c| c.phase()),
            Some(CalculationPhase::GaugeValidation)
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("stitch stage failed"));
        assert!(err.user_friendly_message().contains("Invalid gauge values"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_input_validation_error_has_no_cause() {
        let err = PatternError::Orchestration {
            failed_stage: PipelineStage::InputValidation,
            agent: None,
            message: "Invalid user request".to_string(),
            source: None,
        };

        assert!(err.source().is_none());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(PipelineStage::InputValidation.to_string(), "input_validation");
    }
}
