pub mod stitch;
pub mod validator;
pub mod workflow;

pub use crate::domain::model::{PatternArtifact, StitchResult, ValidationReport};
pub use crate::domain::ports::Stage;
pub use crate::utils::error::Result;
pub use workflow::PatternWorkflow;
