//! Decides whether a new generation request overlaps an active job's
//! scope.

use std::collections::HashSet;
use uuid::Uuid;

/// Resolves a node's parent, for walking the ancestor chain. Implemented
/// by the storage layer against the material tree; a plain `HashMap`
/// suffices for tests.
pub trait ParentLookup {
    fn parent_of(&self, node_id: Uuid) -> Option<Uuid>;
}

impl ParentLookup for std::collections::HashMap<Uuid, Uuid> {
    fn parent_of(&self, node_id: Uuid) -> Option<Uuid> {
        self.get(&node_id).copied()
    }
}

/// A job scope: `None` targets the whole course.
pub type Scope = Option<Uuid>;

/// Minimal view of an active job needed to check for conflicts.
#[derive(Debug, Clone, Copy)]
pub struct ActiveJob {
    pub job_id: Uuid,
    pub node_id: Scope,
}

/// Describes which active job conflicts with a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub conflicting_job_id: Uuid,
    pub conflicting_job_node: Scope,
    pub reason: String,
}

/// Fast overlap check requiring no tree walk: whole-course scopes overlap
/// anything, and identical scopes always overlap.
fn scopes_overlap_fast(target: Scope, job: Scope) -> bool {
    target.is_none() || job.is_none() || target == job
}

fn overlap_reason(target: Scope, job: Scope) -> &'static str {
    match (target, job) {
        (None, None) => "both target the entire course",
        (t, j) if t == j => "both target the same node",
        (_, None) => "active job covers entire course",
        (None, _) => "new request covers entire course",
        _ => unreachable!("scopes_overlap_fast only returns true for the cases above"),
    }
}

/// Walk the ancestor chain from `descendant` up to the root, looking for
/// `ancestor`. Returns `false` if either scope is whole-course (handled
/// by the fast path) or if a cycle is detected (defensive: tree data
/// should be acyclic by invariant).
fn is_ancestor_or_same(lookup: &impl ParentLookup, ancestor: Scope, descendant: Scope) -> bool {
    let (Some(ancestor), Some(descendant)) = (ancestor, descendant) else {
        return false;
    };
    let mut current = Some(descendant);
    let mut visited = HashSet::new();
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        if !visited.insert(id) {
            break;
        }
        current = lookup.parent_of(id);
    }
    false
}

/// Check whether `target_node_id` overlaps any job in `active_jobs`.
/// Returns the first conflict found, or `None`.
pub fn detect_conflict(
    lookup: &impl ParentLookup,
    target_node_id: Scope,
    active_jobs: &[ActiveJob],
) -> Option<ConflictInfo> {
    for job in active_jobs {
        if scopes_overlap_fast(target_node_id, job.node_id) {
            return Some(ConflictInfo {
                conflicting_job_id: job.job_id,
                conflicting_job_node: job.node_id,
                reason: overlap_reason(target_node_id, job.node_id).to_string(),
            });
        }
        if is_ancestor_or_same(lookup, job.node_id, target_node_id) {
            return Some(ConflictInfo {
                conflicting_job_id: job.job_id,
                conflicting_job_node: job.node_id,
                reason: "target is nested inside active job scope".to_string(),
            });
        }
        if is_ancestor_or_same(lookup, target_node_id, job.node_id) {
            return Some(ConflictInfo {
                conflicting_job_id: job.job_id,
                conflicting_job_node: job.node_id,
                reason: "active job scope is nested inside target".to_string(),
            });
        }
    }
    None
}
