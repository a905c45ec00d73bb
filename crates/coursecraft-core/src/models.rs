//! Data model shared by every repository and orchestrator in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing and isolation boundary; every tenant-scoped record carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// Persisted record backing an issued API key. The full key is never
/// stored; only its hash and a display prefix survive creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key_hash: String,
    pub key_prefix: String,
    pub label: String,
    pub scopes: Vec<String>,
    pub rate_limit_prep: u32,
    pub rate_limit_check: u32,
    pub is_active: bool,
    pub tenant_id: Uuid,
}

/// A tenant-owned course: material tree root, source materials, jobs,
/// LLM call history, and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A node in a course's self-referential material tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialNode {
    pub id: Uuid,
    pub course_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    /// Lazily computed Merkle fingerprint; `None` means stale.
    pub node_fingerprint: Option<String>,
}

/// Lifecycle state of a [`MaterialEntry`]. Richer than the four-state
/// `Job`-style machine so the readiness checker can distinguish "never
/// ingested" from "ingestion in flight" from "corrupted after the fact".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Uploaded but not yet queued for processing. Maps to the simple
    /// machine's `pending`.
    Raw,
    /// Ingestion is in flight. Maps to the simple machine's `processing`.
    Pending,
    /// Ingestion succeeded and `processed_content` is populated. Maps to
    /// the simple machine's `done`.
    Ready,
    /// Ingestion failed. Maps to the simple machine's `error`.
    Error,
    /// Content was found corrupted outside the normal transition path
    /// (e.g. a storage integrity check). Has no counterpart in the
    /// four-state machine and no incoming transition of its own.
    IntegrityBroken,
}

/// A file or URL attached to a [`MaterialNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub id: Uuid,
    pub node_id: Uuid,
    pub filename: String,
    pub source_url: Option<String>,
    pub processed_content: Option<String>,
    /// Lazily computed content hash; `None` until `processed_content` is
    /// set and hashed.
    pub content_fingerprint: Option<String>,
    pub state: EntryState,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Kind of content a source was authored in. Selects the ingestion
/// processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Video,
    Presentation,
    Text,
    Web,
}

/// Category of work a [`Job`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Ingest,
    GenerateStructure,
}

/// Scheduling class. `Immediate` bypasses the work window entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Normal,
    Immediate,
}

/// Lifecycle state of a [`Job`]. See [`crate::job_state`] for the
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Complete,
    Failed,
    Cancelled,
}

/// A durable unit of work dispatched to the external queue.
///
/// Exactly one of `result_material_id` / `result_snapshot_id` may be set;
/// enforced at the repository layer (`chk_job_result_exclusive`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub course_id: Uuid,
    pub node_id: Option<Uuid>,
    pub job_type: JobType,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub arq_job_id: Option<String>,
    pub input_params: serde_json::Value,
    pub result_material_id: Option<Uuid>,
    pub result_snapshot_id: Option<Uuid>,
    pub depends_on: Vec<Uuid>,
    pub error_message: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_at: Option<DateTime<Utc>>,
}

/// Audit record for a single provider invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCall {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub action: String,
    pub strategy: String,
    pub provider: String,
    pub model_id: String,
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
    pub latency_ms: u64,
    pub cost_usd: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Content-addressed cached generation output. Identity is
/// `(course_id, node_id.unwrap_or(NIL), node_fingerprint, mode)`; see
/// [`crate::NIL_UUID`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStructureSnapshot {
    pub id: Uuid,
    pub course_id: Uuid,
    pub node_id: Option<Uuid>,
    pub node_fingerprint: String,
    pub mode: String,
    pub structure: serde_json::Value,
    pub prompt_version: String,
    pub model_id: String,
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
    pub cost_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of validating a slide/video alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationState {
    Validated,
    PendingValidation,
    ValidationFailed,
}

/// A presentation-slide-to-video-segment alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideVideoMapping {
    pub id: Uuid,
    pub node_id: Uuid,
    pub presentation_entry_id: Uuid,
    pub video_entry_id: Uuid,
    pub slide_number: u32,
    pub video_timecode_start: u32,
    pub video_timecode_end: Option<u32>,
    pub order: i32,
    pub validation_state: ValidationState,
    pub blocking_factors: Option<Vec<String>>,
    pub validation_errors: Option<Vec<String>>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// All-zero UUID used as the NIL sentinel in the snapshot unique index
/// when a snapshot targets the whole course (`node_id = None`).
pub const NIL_UUID: Uuid = Uuid::nil();

/// A typed content unit a heavy-step processor emits, ordered within its
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub kind: ChunkType,
    pub content: String,
    pub order: i64,
    pub metadata: serde_json::Value,
}

/// Kind of a [`ContentChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Text,
    Code,
    Table,
    ImageDescription,
}

/// The canonical output of a heavy-step processor before orchestrator
/// serialization into `processed_content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source_type: SourceType,
    pub title: String,
    pub chunks: Vec<ContentChunk>,
}

/// Read-only projection of a course subtree handed to a generation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContext {
    pub course_id: Uuid,
    pub course_title: String,
    pub nodes: Vec<MaterialNode>,
    pub entries: Vec<MaterialEntry>,
}

/// Aggregate counters over a set of [`LlmCall`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_cost_usd: f64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub avg_latency_ms: f64,
}

/// A [`CostSummary`] grouped under a dimension value (action name,
/// provider name, or model id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedCost {
    pub key: String,
    pub summary: CostSummary,
}

/// Full cost report backing `GET /reports/cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub overall: CostSummary,
    pub by_action: Vec<GroupedCost>,
    pub by_provider: Vec<GroupedCost>,
    pub by_model: Vec<GroupedCost>,
}

/// The nested course program a `GenerateStructure` job asks the model
/// router to produce: modules, each with lessons, each with the
/// concepts and exercises drawn from the underlying material.
///
/// Forced as the router's structured-output schema; the generation
/// orchestrator serializes the result into
/// [`CourseStructureSnapshot::structure`] as `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GeneratedCourseStructure {
    pub modules: Vec<GeneratedModule>,
}

/// One module of a [`GeneratedCourseStructure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GeneratedModule {
    pub title: String,
    pub description: Option<String>,
    pub lessons: Vec<GeneratedLesson>,
}

/// One lesson of a [`GeneratedModule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GeneratedLesson {
    pub title: String,
    pub description: Option<String>,
    pub concepts: Vec<String>,
    pub exercises: Vec<String>,
}
