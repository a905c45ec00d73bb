//! Job persistence, status transitions, and the dangling-job reconciler
//! query. Transition legality itself lives in
//! `coursecraft_core::job_state`; this repository is the I/O boundary
//! around it.

use chrono::{DateTime, Duration, Utc};
use coursecraft_core::job_state;
use coursecraft_core::models::{Job, JobPriority, JobStatus, JobType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// `tenant_id` is optional: `Some` scopes every query to one tenant via
/// a join against `courses` (jobs carry no `tenant_id` column of their
/// own), `None` is the system/worker bypass used when dispatching queued
/// work, matching [`crate::LlmCallRepository`]'s convention.
pub struct JobRepository<'a> {
    pool: &'a PgPool,
    tenant_id: Option<Uuid>,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a PgPool, tenant_id: Option<Uuid>) -> Self {
        Self { pool, tenant_id }
    }

    /// Inserts a new `queued` job. Part of the enqueue-helper sequence:
    /// the caller still owns submitting to the external queue and
    /// writing `arq_job_id` back via [`Self::attach_queue_handle`].
    pub async fn create(
        &self,
        course_id: Uuid,
        node_id: Option<Uuid>,
        job_type: JobType,
        priority: JobPriority,
        input_params: serde_json::Value,
        depends_on: &[Uuid],
    ) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (
                id, course_id, node_id, job_type, priority, status,
                input_params, depends_on, queued_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, 'queued', $5, $6, now())
            RETURNING id, course_id, node_id, job_type, priority, status,
                      arq_job_id, input_params, result_material_id, result_snapshot_id,
                      depends_on, error_message, queued_at, started_at, completed_at,
                      estimated_at
            "#,
        )
        .bind(course_id)
        .bind(node_id)
        .bind(job_type_str(job_type))
        .bind(priority_str(priority))
        .bind(input_params)
        .bind(depends_on)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn attach_queue_handle(&self, job_id: Uuid, arq_job_id: &str) -> Result<()> {
        sqlx::query("UPDATE jobs SET arq_job_id = $2 WHERE id = $1")
            .bind(job_id)
            .bind(arq_job_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Tenant-scoped when constructed with `Some(tenant_id)`: joins to
    /// `courses` since `jobs` carries no `tenant_id` column of its own. A
    /// job belonging to a different tenant is reported as
    /// [`StorageError::NotFound`], same as a job that doesn't exist.
    pub async fn get_by_id(&self, job_id: Uuid) -> Result<Job> {
        let row = if let Some(tenant_id) = self.tenant_id {
            sqlx::query_as::<_, JobRow>(
                r#"
                SELECT jobs.id, jobs.course_id, jobs.node_id, jobs.job_type, jobs.priority,
                       jobs.status, jobs.arq_job_id, jobs.input_params, jobs.result_material_id,
                       jobs.result_snapshot_id, jobs.depends_on, jobs.error_message,
                       jobs.queued_at, jobs.started_at, jobs.completed_at, jobs.estimated_at
                FROM jobs
                JOIN courses ON courses.id = jobs.course_id
                WHERE jobs.id = $1 AND courses.tenant_id = $2
                "#,
            )
            .bind(job_id)
            .bind(tenant_id)
            .fetch_optional(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, JobRow>(
                r#"
                SELECT id, course_id, node_id, job_type, priority, status,
                       arq_job_id, input_params, result_material_id, result_snapshot_id,
                       depends_on, error_message, queued_at, started_at, completed_at,
                       estimated_at
                FROM jobs WHERE id = $1
                "#,
            )
            .bind(job_id)
            .fetch_optional(self.pool)
            .await?
        };
        row.map(Into::into).ok_or(StorageError::NotFound(job_id))
    }

    pub async fn activate(&self, job_id: Uuid) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job_state::activate(&mut job)?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job_state::cancel(&mut job)?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    pub async fn complete_with_material(&self, job_id: Uuid, material_id: Uuid) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job.result_material_id = Some(material_id);
        job_state::complete(&mut job)?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    pub async fn complete_with_snapshot(&self, job_id: Uuid, snapshot_id: Uuid) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job.result_snapshot_id = Some(snapshot_id);
        job_state::complete(&mut job)?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    pub async fn fail(&self, job_id: Uuid, error_message: &str) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job_state::fail(&mut job, error_message.to_string())?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    /// Administrator-initiated `failed → queued` retry. The original
    /// system has no automatic retry loop for this transition.
    pub async fn retry(&self, job_id: Uuid) -> Result<Job> {
        let mut job = self.get_by_id(job_id).await?;
        job_state::retry(&mut job)?;
        self.persist_transition(&job).await?;
        Ok(job)
    }

    async fn persist_transition(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET
                status = $2,
                result_material_id = $3,
                result_snapshot_id = $4,
                error_message = $5,
                started_at = $6,
                completed_at = $7
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(status_str(job.status))
        .bind(job.result_material_id)
        .bind(job.result_snapshot_id)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Candidates for the dangling-job sweep: `status = 'queued'` with
    /// no queue handle, older than `older_than`. Returning the
    /// candidates is the repository's whole responsibility; re-submission
    /// is an operator-invoked follow-up, not an automatic loop.
    pub async fn find_dangling(&self, older_than: DateTime<Utc>) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, course_id, node_id, job_type, priority, status,
                   arq_job_id, input_params, result_material_id, result_snapshot_id,
                   depends_on, error_message, queued_at, started_at, completed_at,
                   estimated_at
            FROM jobs
            WHERE status = 'queued' AND arq_job_id IS NULL AND queued_at < $1
            ORDER BY queued_at
            "#,
        )
        .bind(older_than)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Convenience wrapper over [`Self::find_dangling`] using a grace
    /// period rather than an absolute cutoff.
    pub async fn find_dangling_older_than(&self, grace: Duration) -> Result<Vec<Job>> {
        self.find_dangling(Utc::now() - grace).await
    }
}

fn job_type_str(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Ingest => "ingest",
        JobType::GenerateStructure => "generate_structure",
    }
}

fn job_type_from_str(s: &str) -> JobType {
    match s {
        "generate_structure" => JobType::GenerateStructure,
        _ => JobType::Ingest,
    }
}

fn priority_str(priority: JobPriority) -> &'static str {
    match priority {
        JobPriority::Normal => "normal",
        JobPriority::Immediate => "immediate",
    }
}

fn priority_from_str(s: &str) -> JobPriority {
    match s {
        "immediate" => JobPriority::Immediate,
        _ => JobPriority::Normal,
    }
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Active => "active",
        JobStatus::Complete => "complete",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> JobStatus {
    match s {
        "active" => JobStatus::Active,
        "complete" => JobStatus::Complete,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        _ => JobStatus::Queued,
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    course_id: Uuid,
    node_id: Option<Uuid>,
    job_type: String,
    priority: String,
    status: String,
    arq_job_id: Option<String>,
    input_params: serde_json::Value,
    result_material_id: Option<Uuid>,
    result_snapshot_id: Option<Uuid>,
    depends_on: Vec<Uuid>,
    error_message: Option<String>,
    queued_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    estimated_at: Option<DateTime<Utc>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            course_id: row.course_id,
            node_id: row.node_id,
            job_type: job_type_from_str(&row.job_type),
            priority: priority_from_str(&row.priority),
            status: status_from_str(&row.status),
            arq_job_id: row.arq_job_id,
            input_params: row.input_params,
            result_material_id: row.result_material_id,
            result_snapshot_id: row.result_snapshot_id,
            depends_on: row.depends_on,
            error_message: row.error_message,
            queued_at: row.queued_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            estimated_at: row.estimated_at,
        }
    }
}
