//! Enqueue helpers: the `create → submit to external queue → attach
//! handle` sequence standing between a request handler and a worker.
//! On submission failure the created job is cancelled rather than left
//! `queued` with no `arq_job_id` — that state is reserved for the
//! dangling-job reconciler, not for a queue that rejected outright.

use coursecraft_core::models::{Job, JobPriority, JobType};
use coursecraft_storage::JobRepository;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{IngestionError, Result};

/// The external work queue a created job is submitted to (an
/// arq-compatible Redis queue in production; a fake in orchestrator
/// tests).
#[async_trait::async_trait]
pub trait ExternalQueue: Send + Sync {
    /// Submit `job_id` for execution and return the queue's own handle,
    /// stored back as `Job::arq_job_id`.
    async fn submit(&self, job_id: Uuid, job_type: JobType) -> std::result::Result<String, QueueError>;
}

/// Raised when the external queue rejects a submission.
#[derive(Debug, thiserror::Error)]
#[error("external queue submission failed: {0}")]
pub struct QueueError(pub String);

async fn create_submit_attach(
    pool: &PgPool,
    queue: &dyn ExternalQueue,
    course_id: Uuid,
    node_id: Option<Uuid>,
    job_type: JobType,
    priority: JobPriority,
    input_params: serde_json::Value,
    depends_on: &[Uuid],
) -> Result<Job> {
    let job_repo = JobRepository::new(pool, None);
    let job = job_repo
        .create(course_id, node_id, job_type, priority, input_params, depends_on)
        .await?;

    match queue.submit(job.id, job_type).await {
        Ok(arq_job_id) => {
            job_repo.attach_queue_handle(job.id, &arq_job_id).await?;
            Ok(job_repo.get_by_id(job.id).await?)
        }
        Err(cause) => {
            // Best-effort: if the cancel itself fails the job is left
            // queued with no handle, which the dangling-job sweep will
            // surface for an operator to re-submit.
            let _ = job_repo.cancel(job.id).await;
            Err(IngestionError::Queue(cause))
        }
    }
}

/// Enqueue an `Ingest` job for one material entry.
pub async fn enqueue_ingestion(
    pool: &PgPool,
    queue: &dyn ExternalQueue,
    course_id: Uuid,
    node_id: Uuid,
    material_id: Uuid,
    priority: JobPriority,
) -> Result<Job> {
    let input_params = serde_json::json!({ "material_id": material_id });
    create_submit_attach(
        pool,
        queue,
        course_id,
        Some(node_id),
        JobType::Ingest,
        priority,
        input_params,
        &[],
    )
    .await
}

/// Enqueue a `GenerateStructure` job, scoped to `node_id` or to the
/// whole course when `node_id` is `None`. `depends_on` lists jobs that
/// must complete first (e.g. the ingestion jobs covering the subtree).
pub async fn enqueue_generation(
    pool: &PgPool,
    queue: &dyn ExternalQueue,
    course_id: Uuid,
    node_id: Option<Uuid>,
    mode: &str,
    priority: JobPriority,
    depends_on: &[Uuid],
) -> Result<Job> {
    let input_params = serde_json::json!({ "mode": mode });
    create_submit_attach(
        pool,
        queue,
        course_id,
        node_id,
        JobType::GenerateStructure,
        priority,
        input_params,
        depends_on,
    )
    .await
}
