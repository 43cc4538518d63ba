use crate::utils::error::{PipelineStage, StageResult};

/// One step of the pattern workflow with a typed input and output.
///
/// The lifetime lets a stage borrow the artifacts produced by earlier stages
/// instead of taking ownership of them.
pub trait Stage<'a> {
    type Input: 'a;
    type Output;

    /// Position of this stage in the workflow; used as the `failed_stage` tag.
    fn kind(&self) -> PipelineStage;

    /// Identity of the component doing the work.
    fn agent(&self) -> &'static str;

    fn process(&self, input: Self::Input) -> StageResult<Self::Output>;
}
