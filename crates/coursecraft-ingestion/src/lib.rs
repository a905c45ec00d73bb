//! Ingestion orchestrator: the source-processor registry, the
//! no-I/O heavy-step contracts processors draw on, and the job that
//! ties priority gating, processor dispatch, and state transitions
//! together.

pub mod enqueue;
pub mod error;
pub mod generation;
pub mod heavy_steps;
pub mod orchestrator;
pub mod processor;

pub use enqueue::{enqueue_generation, enqueue_ingestion, ExternalQueue, QueueError};
pub use error::{HeavyStepError, HeavyStepResult, IngestionError, Result};
pub use generation::{GenerationOrchestrator, GenerationOutcome, GenerationRequest};
pub use heavy_steps::{
    DescribeSlides, HeavySteps, ScrapeWeb, ScrapedContent, SlideDescription, Transcribe,
    Transcript, TranscriptSegment,
};
pub use orchestrator::{IngestionOrchestrator, IngestionOutcome, IngestionRequest};
pub use processor::{PresentationProcessor, Processor, ProcessorRegistry, TextProcessor, VideoProcessor, WebProcessor};
