//! Request/response shapes for the (out-of-scope) HTTP surface. Plain
//! serde-derived DTOs that a future handler layer would marshal —
//! no router, no handler function, lives here.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{JobPriority, JobStatus, JobType, SourceType};

/// Body of `POST /courses`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseCreateRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Body of `POST /courses/{id}/materials`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MaterialCreateRequest {
    pub node_id: Uuid,
    pub filename: String,
    pub source_type: SourceType,
    /// Present for `Web`; absent when content is uploaded directly.
    pub source_url: Option<String>,
}

/// Body of `POST /courses/{id}/slide-mapping`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideMappingCreateRequest {
    pub node_id: Uuid,
    pub presentation_entry_id: Uuid,
    pub video_entry_id: Uuid,
    pub slide_number: u32,
    pub video_timecode_start: u32,
    pub video_timecode_end: Option<u32>,
    pub order: i32,
}

/// Response body of `GET /jobs/{id}`: a read-only projection of [`Job`]
/// that drops the internal `arq_job_id` queue handle.
///
/// [`Job`]: crate::models::Job
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub node_id: Option<Uuid>,
    pub job_type: JobType,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub result_material_id: Option<Uuid>,
    pub result_snapshot_id: Option<Uuid>,
    pub depends_on: Vec<Uuid>,
    pub error_message: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_at: Option<DateTime<Utc>>,
}

impl From<crate::models::Job> for JobView {
    fn from(job: crate::models::Job) -> Self {
        Self {
            id: job.id,
            course_id: job.course_id,
            node_id: job.node_id,
            job_type: job.job_type,
            priority: job.priority,
            status: job.status,
            result_material_id: job.result_material_id,
            result_snapshot_id: job.result_snapshot_id,
            depends_on: job.depends_on,
            error_message: job.error_message,
            queued_at: job.queued_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            estimated_at: job.estimated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_view_drops_the_queue_handle() {
        let job = crate::models::Job {
            id: Uuid::nil(),
            course_id: Uuid::nil(),
            node_id: None,
            job_type: JobType::Ingest,
            priority: JobPriority::Normal,
            status: JobStatus::Queued,
            arq_job_id: Some("arq:1234".to_string()),
            input_params: serde_json::json!({}),
            result_material_id: None,
            result_snapshot_id: None,
            depends_on: vec![],
            error_message: None,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            estimated_at: None,
        };
        let view: JobView = job.into();
        assert_eq!(view.status, JobStatus::Queued);
    }

    #[test]
    fn material_create_request_round_trips_through_json() {
        let req = MaterialCreateRequest {
            node_id: Uuid::nil(),
            filename: "lecture.mp4".to_string(),
            source_type: SourceType::Video,
            source_url: None,
        };
        let raw = serde_json::to_string(&req).unwrap();
        let back: MaterialCreateRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.filename, "lecture.mp4");
    }
}
