//! Crate-spanning error taxonomy.
//!
//! Each subsystem module defines its own narrow error enum and converts it
//! into [`CoreError`] at its boundary, so a caller juggling a job, a
//! fingerprint, and a conflict check only ever propagates one type.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced across the orchestration substrate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Resource missing, or present but owned by a different tenant.
    ///
    /// Deliberately indistinguishable from a true absence: repository
    /// callers must not leak cross-tenant existence.
    #[error("not found")]
    NotFound,

    /// Tenant context lacks a required scope.
    #[error("forbidden: missing scope {scope}")]
    Forbidden {
        /// Scope that was required but absent.
        scope: String,
    },

    /// Malformed input, including an unknown `source_type` or a missing
    /// `source_url`/file.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// An illegal state transition was attempted.
    #[error("invalid transition from {from} to {to}")]
    StatusTransitionError {
        /// Starting state.
        from: String,
        /// Rejected target state.
        to: String,
    },

    /// An active job's scope overlaps the requested scope.
    #[error("generation conflict: job {conflicting_job_id} ({reason})")]
    GenerationConflict {
        /// The job already occupying the overlapping scope.
        conflicting_job_id: Uuid,
        /// Node the conflicting job targets, `None` for whole-course.
        conflicting_job_node: Option<Uuid>,
        /// Human-readable explanation.
        reason: String,
    },

    /// The readiness checker reported a non-empty stale set.
    #[error("{0} material(s) are not ready")]
    NoReadyMaterials(usize),

    /// The requested node does not exist in the course tree.
    #[error("node not found: {0}")]
    NodeNotFound(Uuid),

    /// An entry's fingerprint was requested before it had processed
    /// content.
    #[error("entry {0} has no processed content")]
    UnprocessedEntry(Uuid),

    /// Dependency job failed or was cancelled before this job could be
    /// dispatched.
    #[error("dependency {dependency_id} ended in state {state}")]
    DependencyFailed {
        /// The dependency job that did not reach `complete`.
        dependency_id: Uuid,
        /// The terminal state it actually reached.
        state: String,
    },
}

/// Result alias for [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        assert_eq!(CoreError::NotFound.to_string(), "not found");
    }

    #[test]
    fn forbidden_display_includes_scope() {
        let err = CoreError::Forbidden {
            scope: "prep".to_string(),
        };
        assert!(err.to_string().contains("prep"));
    }

    #[test]
    fn status_transition_display() {
        let err = CoreError::StatusTransitionError {
            from: "queued".to_string(),
            to: "complete".to_string(),
        };
        assert_eq!(err.to_string(), "invalid transition from queued to complete");
    }

    #[test]
    fn generation_conflict_display_includes_job_id() {
        let id = Uuid::nil();
        let err = CoreError::GenerationConflict {
            conflicting_job_id: id,
            conflicting_job_node: None,
            reason: "active job covers entire course".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("covers entire course"));
    }

    #[test]
    fn no_ready_materials_display() {
        let err = CoreError::NoReadyMaterials(3);
        assert_eq!(err.to_string(), "3 material(s) are not ready");
    }
}
