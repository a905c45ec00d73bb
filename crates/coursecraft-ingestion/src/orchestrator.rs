//! Drives one ingestion job end to end: priority gate, processor
//! dispatch, canonical serialization, and the two-path (success/failure)
//! state transition.

use coursecraft_core::job_state;
use coursecraft_core::models::{EntryState, JobPriority, SourceType};
use coursecraft_core::priority_gate::{self, Defer};
use coursecraft_core::work_window::WorkWindow;
use coursecraft_llm::ModelRouter;
use coursecraft_storage::{JobRepository, NodeRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{IngestionError, Result};
use crate::processor::ProcessorRegistry;

/// The five inputs the original orchestrator takes per job.
#[derive(Debug, Clone, Copy)]
pub struct IngestionRequest {
    pub job_id: Uuid,
    pub material_id: Uuid,
    pub source_type: SourceType,
    pub priority: JobPriority,
}

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum IngestionOutcome {
    /// Deferred by the priority gate; no state was touched and the
    /// caller is expected to resubmit after `defer_seconds`.
    Deferred { defer_seconds: i64 },
    /// The processor ran and the entry reached `ready`.
    Completed,
}

/// Coordinates repository access, the processor registry, and a router
/// across one job's lifetime. Built once per worker process; `run` is
/// called per dispatched job.
pub struct IngestionOrchestrator {
    pool: PgPool,
    registry: ProcessorRegistry,
    router: Option<ModelRouter>,
    window: WorkWindow,
}

impl IngestionOrchestrator {
    pub fn new(
        pool: PgPool,
        registry: ProcessorRegistry,
        router: Option<ModelRouter>,
        window: WorkWindow,
    ) -> Self {
        Self { pool, registry, router, window }
    }

    pub async fn run(&self, request: IngestionRequest) -> Result<IngestionOutcome> {
        if let Err(Defer { defer_seconds }) =
            priority_gate::check_work_window(request.priority, &self.window)
        {
            return Ok(IngestionOutcome::Deferred { defer_seconds });
        }

        match self.process(request).await {
            Ok(()) => Ok(IngestionOutcome::Completed),
            Err(err) => {
                self.record_failure(request, &err).await?;
                Err(err)
            }
        }
    }

    async fn process(&self, request: IngestionRequest) -> Result<()> {
        let job_repo = JobRepository::new(&self.pool, None);
        let node_repo = NodeRepository::new(&self.pool, None);

        job_repo.activate(request.job_id).await?;

        let mut entry = node_repo.get_entry_by_id(request.material_id).await?;
        job_state::entry_start_processing(&mut entry)?;
        node_repo.persist_entry(&entry).await?;

        let processor = self
            .registry
            .get(request.source_type)
            .ok_or(IngestionError::NoProcessor(request.source_type))?;
        let document = processor.process(&entry, self.router.as_ref()).await?;

        entry.processed_content = Some(serde_json::to_string(&document).map_err(|e| {
            crate::error::HeavyStepError::ProcessingFailed(format!(
                "failed to serialize source document: {e}"
            ))
        })?);
        entry.content_fingerprint = None;
        coursecraft_core::fingerprint::ensure_material_fp(&mut entry)?;

        job_state::entry_mark_done(&mut entry)?;
        node_repo.persist_entry(&entry).await?;

        // New processed content invalidates the cached Merkle fingerprint
        // of this entry's node and every ancestor up to the course root.
        node_repo.clear_ancestor_fingerprints(entry.node_id).await?;

        job_repo.complete_with_material(request.job_id, entry.id).await?;
        Ok(())
    }

    /// The original's "rollback current session, open a separate session,
    /// write the failure" pattern. Every write here uses a fresh
    /// repository constructed against the same connection pool rather
    /// than any state left over from `process`'s failed attempt — each
    /// repository call is already its own round trip, so nothing from
    /// the failed path is left half-committed for this to roll back.
    async fn record_failure(&self, request: IngestionRequest, err: &IngestionError) -> Result<()> {
        let job_repo = JobRepository::new(&self.pool, None);
        let node_repo = NodeRepository::new(&self.pool, None);

        if let Ok(mut entry) = node_repo.get_entry_by_id(request.material_id).await {
            if entry.state != EntryState::Error {
                let _ = job_state::entry_mark_error(&mut entry, err.to_string());
                node_repo.persist_entry(&entry).await?;
            }
        }
        job_repo.fail(request.job_id, &err.to_string()).await?;
        Ok(())
    }
}
