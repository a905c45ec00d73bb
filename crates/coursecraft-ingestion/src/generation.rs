//! Drives one `GenerateStructure` job end to end: priority gate, readiness
//! gate over the target subtree, fingerprint-cached snapshot lookup,
//! structured-output generation, and the two-path (success/failure) state
//! transition. Mirrors [`crate::orchestrator::IngestionOrchestrator`]'s
//! shape for the sibling job type.

use std::collections::HashMap;

use coursecraft_core::fingerprint::{ensure_node_fp, NodeTree};
use coursecraft_core::models::{GeneratedCourseStructure, JobPriority, MaterialEntry, MaterialNode};
use coursecraft_core::priority_gate::{self, Defer};
use coursecraft_core::readiness;
use coursecraft_core::tree::{self, NodeWithChildren};
use coursecraft_core::work_window::WorkWindow;
use coursecraft_core::{CoreError, NIL_UUID};
use coursecraft_llm::{LlmRequest, ModelRouter};
use coursecraft_storage::{JobRepository, NodeRepository, SnapshotRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{HeavyStepError, Result};

const PROMPT_VERSION: &str = "v1";
const SCHEMA_NAME: &str = "GeneratedCourseStructure";

/// The inputs a dispatched `GenerateStructure` job carries, decoded from
/// `Job::course_id`/`Job::node_id` and the `mode` key of `input_params`.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub job_id: Uuid,
    pub course_id: Uuid,
    pub node_id: Option<Uuid>,
    pub mode: String,
    pub priority: JobPriority,
}

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Deferred by the priority gate; no state was touched.
    Deferred { defer_seconds: i64 },
    /// A cache hit or a fresh generation reached `complete`.
    Completed,
}

/// Coordinates the model router, the node tree, and the snapshot cache
/// across one generation job's lifetime. Built once per worker process;
/// `run` is called per dispatched job.
pub struct GenerationOrchestrator {
    pool: PgPool,
    router: ModelRouter,
    window: WorkWindow,
}

impl GenerationOrchestrator {
    pub fn new(pool: PgPool, router: ModelRouter, window: WorkWindow) -> Self {
        Self { pool, router, window }
    }

    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        if let Err(Defer { defer_seconds }) =
            priority_gate::check_work_window(request.priority, &self.window)
        {
            return Ok(GenerationOutcome::Deferred { defer_seconds });
        }

        match self.process(&request).await {
            Ok(()) => Ok(GenerationOutcome::Completed),
            Err(err) => {
                self.record_failure(&request, &err).await?;
                Err(err)
            }
        }
    }

    async fn process(&self, request: &GenerationRequest) -> Result<()> {
        let job_repo = JobRepository::new(&self.pool, None);
        let node_repo = NodeRepository::new(&self.pool, None);
        let snapshot_repo = SnapshotRepository::new(&self.pool, None);

        job_repo.activate(request.job_id).await?;

        let all_nodes = node_repo.list_for_course(request.course_id).await?;
        let roots = build_forest(all_nodes);
        let (resolved_node_id, flat_nodes) = tree::resolve_target_nodes(&roots, request.node_id)?;

        let mut entries_by_node: HashMap<Uuid, Vec<MaterialEntry>> = HashMap::new();
        for node in &flat_nodes {
            let entries = node_repo.entries_for_node(node.id).await?;
            entries_by_node.insert(node.id, entries);
        }

        let nodes_with_entries: Vec<(MaterialNode, Vec<MaterialEntry>)> = flat_nodes
            .iter()
            .cloned()
            .map(|node| {
                let entries = entries_by_node.get(&node.id).cloned().unwrap_or_default();
                (node, entries)
            })
            .collect();
        let readiness = readiness::check_subtree(&nodes_with_entries);
        if !readiness.ready {
            return Err(CoreError::NoReadyMaterials(readiness.stale.len()).into());
        }

        let mut subtree = match resolved_node_id {
            Some(id) => {
                let target = tree::find_node_bfs(&roots, id).ok_or(CoreError::NodeNotFound(id))?;
                build_node_tree(target, &entries_by_node)
            }
            None => NodeTree {
                node_id: NIL_UUID,
                node_fingerprint: None,
                entries: Vec::new(),
                children: roots.iter().map(|root| build_node_tree(root, &entries_by_node)).collect(),
            },
        };
        let fingerprint = ensure_node_fp(&mut subtree)?;

        let snapshot = match snapshot_repo
            .find_by_identity(request.course_id, resolved_node_id, &fingerprint, &request.mode)
            .await?
        {
            Some(cached) => cached,
            None => {
                let outline = match request.mode.as_str() {
                    "guided" => match resolved_node_id {
                        Some(id) => {
                            let target = tree::find_node_bfs(&roots, id).ok_or(CoreError::NodeNotFound(id))?;
                            tree::serialize_guided(std::slice::from_ref(target))
                        }
                        None => tree::serialize_guided(&roots),
                    },
                    _ => serde_json::to_value(&flat_nodes).map_err(|e| {
                        HeavyStepError::ProcessingFailed(format!("failed to serialize material tree: {e}"))
                    })?,
                };

                let prompt = serde_json::json!({
                    "course_id": request.course_id,
                    "mode": request.mode,
                    "outline": outline,
                })
                .to_string();

                let llm_request = LlmRequest {
                    prompt,
                    system_prompt: Some(
                        "Synthesize a nested course program (modules -> lessons -> concepts/exercises) \
                         from the provided material outline."
                            .to_string(),
                    ),
                    model_id: None,
                    temperature: 0.2,
                    max_tokens: 4096,
                    action: "generate_structure".to_string(),
                    strategy: request.mode.clone(),
                };

                let (structure, response) = self
                    .router
                    .complete_structured::<GeneratedCourseStructure>(
                        "generate_structure",
                        &request.mode,
                        llm_request,
                        SCHEMA_NAME,
                    )
                    .await?;

                let structure_value = serde_json::to_value(&structure).map_err(|e| {
                    HeavyStepError::ProcessingFailed(format!("failed to serialize generated structure: {e}"))
                })?;

                snapshot_repo
                    .create(
                        request.course_id,
                        resolved_node_id,
                        &fingerprint,
                        &request.mode,
                        structure_value,
                        PROMPT_VERSION,
                        &response.model_id,
                        response.tokens_in,
                        response.tokens_out,
                        response.cost_usd,
                    )
                    .await?
            }
        };

        // The freshly computed fingerprint becomes the node's cached value;
        // `clear_ancestor_fingerprints` (ingestion side) only ever nulls it
        // out, so generation is what writes it back after a successful run.
        if let Some(id) = resolved_node_id {
            node_repo.update_node_fingerprint(id, &fingerprint).await?;
        }

        job_repo.complete_with_snapshot(request.job_id, snapshot.id).await?;
        Ok(())
    }

    async fn record_failure(&self, request: &GenerationRequest, err: &crate::error::IngestionError) -> Result<()> {
        let job_repo = JobRepository::new(&self.pool, None);
        job_repo.fail(request.job_id, &err.to_string()).await?;
        Ok(())
    }
}

/// Groups a flat, course-scoped node list into root forests by `parent_id`.
fn build_forest(nodes: Vec<MaterialNode>) -> Vec<NodeWithChildren> {
    let mut children_of: HashMap<Option<Uuid>, Vec<MaterialNode>> = HashMap::new();
    for node in nodes {
        children_of.entry(node.parent_id).or_default().push(node);
    }

    fn assemble(parent: Option<Uuid>, children_of: &mut HashMap<Option<Uuid>, Vec<MaterialNode>>) -> Vec<NodeWithChildren> {
        let Some(siblings) = children_of.remove(&parent) else {
            return Vec::new();
        };
        siblings
            .into_iter()
            .map(|node| {
                let id = node.id;
                NodeWithChildren {
                    children: assemble(Some(id), children_of),
                    node,
                }
            })
            .collect()
    }

    assemble(None, &mut children_of)
}

/// Builds an in-memory [`NodeTree`] for fingerprinting from an already
/// loaded [`NodeWithChildren`] subtree plus a preloaded entries map.
fn build_node_tree(node: &NodeWithChildren, entries_by_node: &HashMap<Uuid, Vec<MaterialEntry>>) -> NodeTree {
    NodeTree {
        node_id: node.node.id,
        node_fingerprint: node.node.node_fingerprint.clone(),
        entries: entries_by_node.get(&node.node.id).cloned().unwrap_or_default(),
        children: node.children.iter().map(|child| build_node_tree(child, entries_by_node)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Uuid, parent: Option<Uuid>, order: i32) -> MaterialNode {
        MaterialNode {
            id,
            course_id: Uuid::new_v4(),
            parent_id: parent,
            title: format!("node-{order}"),
            description: None,
            order,
            node_fingerprint: None,
        }
    }

    #[test]
    fn build_forest_groups_children_under_their_parent() {
        let root_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let other_root_id = Uuid::new_v4();
        let nodes = vec![
            node(root_id, None, 0),
            node(child_id, Some(root_id), 0),
            node(other_root_id, None, 1),
        ];
        let forest = build_forest(nodes);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].node.id, root_id);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].node.id, child_id);
        assert_eq!(forest[1].node.id, other_root_id);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn build_forest_handles_empty_course() {
        assert!(build_forest(Vec::new()).is_empty());
    }

    #[test]
    fn build_node_tree_carries_cached_fingerprint_and_entries() {
        let id = Uuid::new_v4();
        let mut n = node(id, None, 0);
        n.node_fingerprint = Some("cached".to_string());
        let tree_node = NodeWithChildren { node: n, children: Vec::new() };
        let mut entries_by_node = HashMap::new();
        entries_by_node.insert(
            id,
            vec![MaterialEntry {
                id: Uuid::new_v4(),
                node_id: id,
                filename: "f".to_string(),
                source_url: None,
                processed_content: Some("hi".to_string()),
                content_fingerprint: None,
                state: coursecraft_core::models::EntryState::Ready,
                processed_at: None,
                error_message: None,
            }],
        );

        let tree = build_node_tree(&tree_node, &entries_by_node);
        assert_eq!(tree.node_id, id);
        assert_eq!(tree.node_fingerprint.as_deref(), Some("cached"));
        assert_eq!(tree.entries.len(), 1);
    }
}
