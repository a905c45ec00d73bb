//! Errors for heavy steps and the orchestrator that drives them.

use thiserror::Error;

/// Raised by a heavy-step pure function. Heavy steps have no DB,
/// object-storage, or ORM access, so their only failure modes are
/// format and content problems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HeavyStepError {
    #[error("source format is not supported by this processor: {0}")]
    UnsupportedFormat(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

pub type HeavyStepResult<T> = std::result::Result<T, HeavyStepError>;

/// Orchestrator-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestionError {
    #[error(transparent)]
    HeavyStep(#[from] HeavyStepError),

    #[error("no processor registered for source type {0:?}")]
    NoProcessor(coursecraft_core::models::SourceType),

    #[error(transparent)]
    Storage(#[from] coursecraft_storage::StorageError),

    #[error(transparent)]
    Core(#[from] coursecraft_core::CoreError),

    #[error(transparent)]
    Router(#[from] coursecraft_llm::RouterError),

    #[error(transparent)]
    Queue(#[from] crate::enqueue::QueueError),
}

pub type Result<T> = std::result::Result<T, IngestionError>;
