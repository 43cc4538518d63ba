pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use config::ConfigTables;
pub use core::PatternWorkflow;
pub use domain::model::PatternArtifact;
pub use utils::error::{PatternError, PipelineStage, Result, StageError};
