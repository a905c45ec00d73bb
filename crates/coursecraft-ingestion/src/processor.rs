//! Source processors: one per [`SourceType`], each turning a
//! [`MaterialEntry`] into a canonical [`SourceDocument`] by driving the
//! heavy steps it needs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coursecraft_core::models::{ChunkType, ContentChunk, MaterialEntry, SourceDocument, SourceType};
use coursecraft_llm::ModelRouter;

use crate::error::{HeavyStepError, HeavyStepResult};
use crate::heavy_steps::HeavySteps;

/// Turns one [`MaterialEntry`] into a [`SourceDocument`]. Implementations
/// may call an injected [`ModelRouter`] for description/summarization
/// work but perform no I/O of their own beyond the heavy steps they were
/// built with — the orchestrator owns persistence.
#[async_trait]
pub trait Processor: Send + Sync {
    fn source_type(&self) -> SourceType;

    async fn process(
        &self,
        entry: &MaterialEntry,
        router: Option<&ModelRouter>,
    ) -> HeavyStepResult<SourceDocument>;
}

fn require_source_url(entry: &MaterialEntry) -> HeavyStepResult<&str> {
    entry
        .source_url
        .as_deref()
        .ok_or_else(|| HeavyStepError::ProcessingFailed(format!("{} has no source_url", entry.filename)))
}

/// Video lecture: transcribe the audio track into timestamped text
/// chunks.
pub struct VideoProcessor {
    transcribe: Arc<dyn crate::heavy_steps::Transcribe>,
}

impl VideoProcessor {
    pub fn new(heavy: &HeavySteps) -> Self {
        Self { transcribe: heavy.transcribe.clone() }
    }
}

#[async_trait]
impl Processor for VideoProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Video
    }

    async fn process(
        &self,
        entry: &MaterialEntry,
        _router: Option<&ModelRouter>,
    ) -> HeavyStepResult<SourceDocument> {
        let path = require_source_url(entry)?;
        let transcript = self.transcribe.transcribe(path).await?;
        let chunks = transcript
            .segments
            .into_iter()
            .enumerate()
            .map(|(order, segment)| ContentChunk {
                kind: ChunkType::Text,
                content: segment.text,
                order: order as i64,
                metadata: serde_json::json!({
                    "start_sec": segment.start_sec,
                    "end_sec": segment.end_sec,
                }),
            })
            .collect();
        Ok(SourceDocument { source_type: SourceType::Video, title: entry.filename.clone(), chunks })
    }
}

/// Slide deck: describe each visually-meaningful page through the
/// optional vision heavy step. Unsupported when no vision step was
/// wired for this deployment.
pub struct PresentationProcessor {
    describe_slides: Option<Arc<dyn crate::heavy_steps::DescribeSlides>>,
}

impl PresentationProcessor {
    pub fn new(heavy: &HeavySteps) -> Self {
        Self { describe_slides: heavy.describe_slides.clone() }
    }
}

#[async_trait]
impl Processor for PresentationProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Presentation
    }

    async fn process(
        &self,
        entry: &MaterialEntry,
        _router: Option<&ModelRouter>,
    ) -> HeavyStepResult<SourceDocument> {
        let describe_slides = self.describe_slides.as_ref().ok_or_else(|| {
            HeavyStepError::UnsupportedFormat("no vision model configured for slide description".to_string())
        })?;
        let path = require_source_url(entry)?;
        let descriptions = describe_slides.describe_slides(path).await?;
        let chunks = descriptions
            .into_iter()
            .map(|slide| ContentChunk {
                kind: ChunkType::ImageDescription,
                content: slide.description,
                order: slide.slide_number as i64,
                metadata: serde_json::json!({ "slide_number": slide.slide_number }),
            })
            .collect();
        Ok(SourceDocument { source_type: SourceType::Presentation, title: entry.filename.clone(), chunks })
    }
}

/// Plain text / already-extracted content: a single chunk carrying
/// `processed_content` verbatim.
pub struct TextProcessor;

#[async_trait]
impl Processor for TextProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Text
    }

    async fn process(
        &self,
        entry: &MaterialEntry,
        _router: Option<&ModelRouter>,
    ) -> HeavyStepResult<SourceDocument> {
        let content = entry.processed_content.clone().ok_or_else(|| {
            HeavyStepError::ProcessingFailed(format!("{} has no content to process", entry.filename))
        })?;
        let chunks = vec![ContentChunk {
            kind: ChunkType::Text,
            content,
            order: 0,
            metadata: serde_json::Value::Null,
        }];
        Ok(SourceDocument { source_type: SourceType::Text, title: entry.filename.clone(), chunks })
    }
}

/// Web page: scrape and extract main content.
pub struct WebProcessor {
    scrape_web: Arc<dyn crate::heavy_steps::ScrapeWeb>,
}

impl WebProcessor {
    pub fn new(heavy: &HeavySteps) -> Self {
        Self { scrape_web: heavy.scrape_web.clone() }
    }
}

#[async_trait]
impl Processor for WebProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Web
    }

    async fn process(
        &self,
        entry: &MaterialEntry,
        _router: Option<&ModelRouter>,
    ) -> HeavyStepResult<SourceDocument> {
        let url = require_source_url(entry)?;
        let scraped = self.scrape_web.scrape(url).await?;
        let chunks = vec![ContentChunk {
            kind: ChunkType::Text,
            content: scraped.text,
            order: 0,
            metadata: serde_json::json!({ "raw_html_len": scraped.raw_html.len() }),
        }];
        Ok(SourceDocument { source_type: SourceType::Web, title: entry.filename.clone(), chunks })
    }
}

/// Registry mapping [`SourceType`] to the processor that handles it.
/// Built once at startup from a [`HeavySteps`] bundle; the orchestrator
/// looks processors up by the entry's source type rather than branching
/// on it at every call site.
pub struct ProcessorRegistry {
    processors: HashMap<SourceType, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new(heavy: &HeavySteps) -> Self {
        let all: Vec<Arc<dyn Processor>> = vec![
            Arc::new(VideoProcessor::new(heavy)),
            Arc::new(PresentationProcessor::new(heavy)),
            Arc::new(TextProcessor),
            Arc::new(WebProcessor::new(heavy)),
        ];
        let processors = all.into_iter().map(|p| (p.source_type(), p)).collect();
        Self { processors }
    }

    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn Processor>> {
        self.processors.get(&source_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coursecraft_core::models::EntryState;
    use uuid::Uuid;

    fn entry(source_url: Option<&str>, processed_content: Option<&str>) -> MaterialEntry {
        MaterialEntry {
            id: Uuid::new_v4(),
            node_id: Uuid::new_v4(),
            filename: "lecture.txt".to_string(),
            source_url: source_url.map(str::to_string),
            processed_content: processed_content.map(str::to_string),
            content_fingerprint: None,
            state: EntryState::Pending,
            processed_at: None,
            error_message: None,
        }
    }

    struct StubTranscribe;
    #[async_trait]
    impl crate::heavy_steps::Transcribe for StubTranscribe {
        async fn transcribe(&self, _audio_path: &str) -> HeavyStepResult<crate::heavy_steps::Transcript> {
            Ok(crate::heavy_steps::Transcript {
                segments: vec![crate::heavy_steps::TranscriptSegment {
                    start_sec: 0.0,
                    end_sec: 1.0,
                    text: "hello".to_string(),
                }],
                language: Some("en".to_string()),
            })
        }
    }

    struct StubScrapeWeb;
    #[async_trait]
    impl crate::heavy_steps::ScrapeWeb for StubScrapeWeb {
        async fn scrape(&self, _url: &str) -> HeavyStepResult<crate::heavy_steps::ScrapedContent> {
            Ok(crate::heavy_steps::ScrapedContent {
                text: "scraped text".to_string(),
                raw_html: "<html></html>".to_string(),
            })
        }
    }

    fn heavy_steps() -> HeavySteps {
        HeavySteps {
            transcribe: Arc::new(StubTranscribe),
            describe_slides: None,
            scrape_web: Arc::new(StubScrapeWeb),
        }
    }

    #[tokio::test]
    async fn video_processor_turns_segments_into_ordered_chunks() {
        let processor = VideoProcessor::new(&heavy_steps());
        let doc = processor.process(&entry(Some("s3://audio.wav"), None), None).await.unwrap();
        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.chunks[0].content, "hello");
    }

    #[tokio::test]
    async fn presentation_processor_fails_without_vision_step() {
        let processor = PresentationProcessor::new(&heavy_steps());
        let err = processor.process(&entry(Some("s3://deck.pdf"), None), None).await.unwrap_err();
        assert!(matches!(err, HeavyStepError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn text_processor_requires_processed_content() {
        let err = TextProcessor.process(&entry(None, None), None).await.unwrap_err();
        assert!(matches!(err, HeavyStepError::ProcessingFailed(_)));
    }

    #[tokio::test]
    async fn web_processor_scrapes_the_source_url() {
        let processor = WebProcessor::new(&heavy_steps());
        let doc = processor.process(&entry(Some("https://example.com"), None), None).await.unwrap();
        assert_eq!(doc.chunks[0].content, "scraped text");
    }

    #[test]
    fn registry_resolves_every_source_type() {
        let registry = ProcessorRegistry::new(&heavy_steps());
        assert!(registry.get(SourceType::Video).is_some());
        assert!(registry.get(SourceType::Presentation).is_some());
        assert!(registry.get(SourceType::Text).is_some());
        assert!(registry.get(SourceType::Web).is_some());
    }
}
