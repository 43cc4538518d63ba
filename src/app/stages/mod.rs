// Collaborator stages around the numeric core.

pub mod construction;
pub mod fabric;
pub mod output;
pub mod requirements;

pub use construction::{ConstructionInput, ConstructionStage};
pub use fabric::{FabricInput, FabricStage};
pub use output::{OutputInput, OutputStage};
pub use requirements::{RequirementsInput, RequirementsStage};
