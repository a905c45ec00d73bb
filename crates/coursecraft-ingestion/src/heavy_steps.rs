//! Heavy-step contracts: transcription, slide description, and web
//! scraping, each a plain async callable with no DB, object-storage, or
//! ORM access. Inputs and outputs are plain values; processors become
//! thin orchestrators that call these via dependency injection.

use async_trait::async_trait;

use crate::error::HeavyStepResult;

/// Single segment of a transcript with timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Result of audio transcription.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

/// `(audio_path) -> Transcript`. Implementations may call out to a local
/// Whisper binary or a hosted transcription API; neither detail is
/// visible here.
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, audio_path: &str) -> HeavyStepResult<Transcript>;
}

/// Vision LLM description of a single rendered slide image.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDescription {
    pub slide_number: u32,
    pub description: String,
}

/// `(pdf_path) -> Vec<SlideDescription>`, one entry per page that carries
/// visual content worth describing.
#[async_trait]
pub trait DescribeSlides: Send + Sync {
    async fn describe_slides(&self, pdf_path: &str) -> HeavyStepResult<Vec<SlideDescription>>;
}

/// Result of web page content extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedContent {
    pub text: String,
    pub raw_html: String,
}

/// `(url) -> ScrapedContent`.
#[async_trait]
pub trait ScrapeWeb: Send + Sync {
    async fn scrape(&self, url: &str) -> HeavyStepResult<ScrapedContent>;
}

/// The heavy steps a processor may draw on, bundled so a processor
/// constructor takes one argument instead of three independently
/// optional ones. Mirrors the original's frozen `HeavySteps` dataclass:
/// `describe_slides` is optional because not every deployment wires a
/// vision model, the other two are always present.
pub struct HeavySteps {
    pub transcribe: std::sync::Arc<dyn Transcribe>,
    pub describe_slides: Option<std::sync::Arc<dyn DescribeSlides>>,
    pub scrape_web: std::sync::Arc<dyn ScrapeWeb>,
}
