//! Reports non-ready materials blocking structure generation over a
//! subtree.

use uuid::Uuid;

use crate::models::{EntryState, MaterialEntry, MaterialNode};

/// States that block structure generation. `Pending` and `Error` do not
/// contribute content but are not "stale" either — they simply don't
/// block generation.
fn is_stale(state: EntryState) -> bool {
    matches!(state, EntryState::Raw | EntryState::IntegrityBroken)
}

/// A material entry blocking generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleMaterial {
    pub entry_id: Uuid,
    pub filename: String,
    pub state: EntryState,
    pub node_id: Uuid,
    pub node_title: String,
}

/// Outcome of a subtree readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessResult {
    pub ready: bool,
    pub stale: Vec<StaleMaterial>,
}

/// Check readiness of an already-loaded subtree: every `(node, entries)`
/// pair that makes up the subtree rooted at the target node, typically
/// produced via [`crate::tree::flatten_subtree`] plus a per-node entry
/// load.
pub fn check_subtree(nodes: &[(MaterialNode, Vec<MaterialEntry>)]) -> ReadinessResult {
    let mut stale = Vec::new();
    for (node, entries) in nodes {
        for entry in entries {
            if is_stale(entry.state) {
                stale.push(StaleMaterial {
                    entry_id: entry.id,
                    filename: entry.filename.clone(),
                    state: entry.state,
                    node_id: node.id,
                    node_title: node.title.clone(),
                });
            }
        }
    }
    ReadinessResult {
        ready: stale.is_empty(),
        stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Uuid, title: &str) -> MaterialNode {
        MaterialNode {
            id,
            course_id: Uuid::new_v4(),
            parent_id: None,
            title: title.to_string(),
            description: None,
            order: 0,
            node_fingerprint: None,
        }
    }

    fn entry(node_id: Uuid, state: EntryState) -> MaterialEntry {
        MaterialEntry {
            id: Uuid::new_v4(),
            node_id,
            filename: "v1.mp4".to_string(),
            source_url: None,
            processed_content: None,
            content_fingerprint: None,
            state,
            processed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn ready_when_all_entries_done() {
        let n = node(Uuid::new_v4(), "Lesson A");
        let result = check_subtree(&[(n.clone(), vec![entry(n.id, EntryState::Ready)])]);
        assert!(result.ready);
        assert!(result.stale.is_empty());
    }

    #[test]
    fn raw_entry_blocks_readiness() {
        let n = node(Uuid::new_v4(), "Lesson A");
        let result = check_subtree(&[(n.clone(), vec![entry(n.id, EntryState::Raw)])]);
        assert!(!result.ready);
        assert_eq!(result.stale.len(), 1);
        assert_eq!(result.stale[0].node_title, "Lesson A");
    }

    #[test]
    fn pending_and_error_do_not_block() {
        let n = node(Uuid::new_v4(), "Lesson A");
        let result = check_subtree(&[(
            n.clone(),
            vec![entry(n.id, EntryState::Pending), entry(n.id, EntryState::Error)],
        )]);
        assert!(result.ready);
    }

    #[test]
    fn integrity_broken_blocks_readiness() {
        let n = node(Uuid::new_v4(), "Lesson A");
        let result = check_subtree(&[(n.clone(), vec![entry(n.id, EntryState::IntegrityBroken)])]);
        assert!(!result.ready);
    }
}
