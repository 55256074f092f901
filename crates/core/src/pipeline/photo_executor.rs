use thiserror::Error;

use super::mask_photo_use_case::{MaskOutcome, MaskPhotoUseCase, PhotoRequest, PipelineError};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("worker panicked while handling request {index}")]
    WorkerPanicked { index: usize },
}

/// Handles one photo request end to end.
pub trait PhotoHandler: Send + Sync {
    fn handle(&self, request: &PhotoRequest) -> Result<MaskOutcome, PipelineError>;
}

impl PhotoHandler for MaskPhotoUseCase {
    fn handle(&self, request: &PhotoRequest) -> Result<MaskOutcome, PipelineError> {
        self.execute(request)
    }
}

/// Abstracts how a batch of independent photo requests is scheduled.
///
/// Results are returned in request order regardless of completion order.
pub trait PhotoExecutor: Send + Sync {
    fn execute_all(
        &self,
        handler: &dyn PhotoHandler,
        requests: Vec<PhotoRequest>,
    ) -> Vec<Result<MaskOutcome, ExecutionError>>;
}
