//! Transition validation for [`JobStatus`] and the `MaterialEntry`
//! sub-machine.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{EntryState, Job, JobStatus, MaterialEntry};

fn allowed_job_transitions(from: JobStatus) -> &'static [JobStatus] {
    match from {
        JobStatus::Queued => &[JobStatus::Active, JobStatus::Cancelled],
        JobStatus::Active => &[JobStatus::Complete, JobStatus::Failed],
        JobStatus::Complete => &[],
        JobStatus::Cancelled => &[],
        JobStatus::Failed => &[JobStatus::Queued],
    }
}

fn status_name(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Active => "active",
        JobStatus::Complete => "complete",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn check_job_transition(from: JobStatus, to: JobStatus) -> Result<()> {
    if allowed_job_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(CoreError::StatusTransitionError {
            from: status_name(from).to_string(),
            to: status_name(to).to_string(),
        })
    }
}

/// Move `job` to `active` and stamp `started_at`.
pub fn activate(job: &mut Job) -> Result<()> {
    check_job_transition(job.status, JobStatus::Active)?;
    job.status = JobStatus::Active;
    job.started_at = Some(Utc::now());
    Ok(())
}

/// Move `job` to `cancelled`.
pub fn cancel(job: &mut Job) -> Result<()> {
    check_job_transition(job.status, JobStatus::Cancelled)?;
    job.status = JobStatus::Cancelled;
    job.completed_at = Some(Utc::now());
    Ok(())
}

/// Move `job` to `complete`. Exactly one of `result_material_id` /
/// `result_snapshot_id` must already be set on `job` — this mirrors
/// `chk_job_result_exclusive` at the in-memory layer; the repository
/// re-asserts it at the database constraint.
pub fn complete(job: &mut Job) -> Result<()> {
    check_job_transition(job.status, JobStatus::Complete)?;
    let has_material = job.result_material_id.is_some();
    let has_snapshot = job.result_snapshot_id.is_some();
    if has_material == has_snapshot {
        return Err(CoreError::ValidationFailure(
            "job completion requires exactly one of result_material_id / result_snapshot_id"
                .to_string(),
        ));
    }
    job.status = JobStatus::Complete;
    job.completed_at = Some(Utc::now());
    Ok(())
}

/// Move `job` to `failed` with `error_message`.
pub fn fail(job: &mut Job, error_message: impl Into<String>) -> Result<()> {
    check_job_transition(job.status, JobStatus::Failed)?;
    job.status = JobStatus::Failed;
    job.completed_at = Some(Utc::now());
    job.error_message = Some(error_message.into());
    Ok(())
}

/// Move a `failed` job back to `queued` for a retry. Per design note,
/// retry is administrator-initiated; no automatic backoff is implemented
/// here.
pub fn retry(job: &mut Job) -> Result<()> {
    check_job_transition(job.status, JobStatus::Queued)?;
    job.status = JobStatus::Queued;
    job.started_at = None;
    job.completed_at = None;
    job.error_message = None;
    Ok(())
}

fn allowed_entry_transitions(from: EntryState) -> &'static [EntryState] {
    match from {
        EntryState::Raw => &[EntryState::Pending],
        EntryState::Pending => &[EntryState::Ready, EntryState::Error],
        EntryState::Ready => &[],
        EntryState::Error => &[],
        // Reachable only via a direct repository-level mark, not via
        // this sub-machine's own transitions.
        EntryState::IntegrityBroken => &[],
    }
}

fn entry_state_name(state: EntryState) -> &'static str {
    match state {
        EntryState::Raw => "raw",
        EntryState::Pending => "pending",
        EntryState::Ready => "ready",
        EntryState::Error => "error",
        EntryState::IntegrityBroken => "integrity_broken",
    }
}

fn check_entry_transition(from: EntryState, to: EntryState) -> Result<()> {
    if allowed_entry_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(CoreError::StatusTransitionError {
            from: entry_state_name(from).to_string(),
            to: entry_state_name(to).to_string(),
        })
    }
}

/// Move `entry` to `pending` (processing started).
pub fn entry_start_processing(entry: &mut MaterialEntry) -> Result<()> {
    check_entry_transition(entry.state, EntryState::Pending)?;
    entry.state = EntryState::Pending;
    Ok(())
}

/// Move `entry` to `ready`, stamping `processed_at`.
pub fn entry_mark_done(entry: &mut MaterialEntry) -> Result<()> {
    check_entry_transition(entry.state, EntryState::Ready)?;
    entry.state = EntryState::Ready;
    entry.processed_at = Some(Utc::now());
    Ok(())
}

/// Move `entry` to `error` with a required message.
pub fn entry_mark_error(entry: &mut MaterialEntry, error_message: impl Into<String>) -> Result<()> {
    check_entry_transition(entry.state, EntryState::Error)?;
    entry.state = EntryState::Error;
    entry.error_message = Some(error_message.into());
    Ok(())
}

/// A job is dispatchable only once every dependency has reached
/// `complete`. Returns `Ok(true)` when every dependency is complete,
/// `Ok(false)` when at least one is still `queued`/`active` (dispatch
/// should simply wait), and `Err(DependencyFailed)` the moment one ended
/// `failed` or `cancelled`.
pub fn check_dependencies(depends_on_statuses: &[(Uuid, JobStatus)]) -> Result<bool> {
    let mut all_complete = true;
    for (id, status) in depends_on_statuses {
        match status {
            JobStatus::Complete => {}
            JobStatus::Failed | JobStatus::Cancelled => {
                return Err(CoreError::DependencyFailed {
                    dependency_id: *id,
                    state: status_name(*status).to_string(),
                });
            }
            JobStatus::Queued | JobStatus::Active => all_complete = false,
        }
    }
    Ok(all_complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPriority, JobType};

    fn job(status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            node_id: None,
            job_type: JobType::GenerateStructure,
            priority: JobPriority::Normal,
            status,
            arq_job_id: None,
            input_params: serde_json::json!({}),
            result_material_id: None,
            result_snapshot_id: None,
            depends_on: Vec::new(),
            error_message: None,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            estimated_at: None,
        }
    }

    #[test]
    fn queued_to_active_allowed() {
        let mut j = job(JobStatus::Queued);
        activate(&mut j).unwrap();
        assert_eq!(j.status, JobStatus::Active);
        assert!(j.started_at.is_some());
    }

    #[test]
    fn queued_to_complete_rejected() {
        let mut j = job(JobStatus::Queued);
        let err = complete(&mut j).unwrap_err();
        assert!(matches!(err, CoreError::StatusTransitionError { .. }));
        assert_eq!(j.status, JobStatus::Queued);
    }

    #[test]
    fn complete_requires_exactly_one_result() {
        let mut j = job(JobStatus::Active);
        let err = complete(&mut j).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailure(_)));

        j.result_material_id = Some(Uuid::new_v4());
        j.result_snapshot_id = Some(Uuid::new_v4());
        let err = complete(&mut j).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailure(_)));

        j.result_snapshot_id = None;
        complete(&mut j).unwrap();
        assert_eq!(j.status, JobStatus::Complete);
    }

    #[test]
    fn failed_can_retry_to_queued() {
        let mut j = job(JobStatus::Failed);
        retry(&mut j).unwrap();
        assert_eq!(j.status, JobStatus::Queued);
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut complete_job = job(JobStatus::Complete);
        assert!(activate(&mut complete_job).is_err());
        let mut cancelled_job = job(JobStatus::Cancelled);
        assert!(activate(&mut cancelled_job).is_err());
    }

    #[test]
    fn dependency_complete_passes() {
        let id = Uuid::new_v4();
        assert_eq!(check_dependencies(&[(id, JobStatus::Complete)]).unwrap(), true);
    }

    #[test]
    fn dependency_still_queued_is_not_ready_but_not_an_error() {
        let id = Uuid::new_v4();
        assert_eq!(check_dependencies(&[(id, JobStatus::Queued)]).unwrap(), false);
    }

    #[test]
    fn dependency_failed_blocks_dispatch() {
        let id = Uuid::new_v4();
        let err = check_dependencies(&[(id, JobStatus::Failed)]).unwrap_err();
        assert!(matches!(err, CoreError::DependencyFailed { .. }));
    }

    #[test]
    fn entry_sub_machine_transitions() {
        let mut e = MaterialEntry {
            id: Uuid::new_v4(),
            node_id: Uuid::new_v4(),
            filename: "x".to_string(),
            source_url: None,
            processed_content: None,
            content_fingerprint: None,
            state: EntryState::Raw,
            processed_at: None,
            error_message: None,
        };
        entry_start_processing(&mut e).unwrap();
        assert_eq!(e.state, EntryState::Pending);
        entry_mark_done(&mut e).unwrap();
        assert_eq!(e.state, EntryState::Ready);
        assert!(entry_start_processing(&mut e).is_err());
    }
}
