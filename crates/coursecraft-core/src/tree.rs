//! BFS traversal and serialization helpers shared by the readiness
//! checker, the conflict detector, and the generation orchestrator's
//! prompt construction.

use std::collections::VecDeque;

use serde_json::json;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::MaterialNode;

/// A [`MaterialNode`] together with its eagerly loaded children, used
/// wherever a caller needs to walk a subtree without further I/O.
#[derive(Debug, Clone)]
pub struct NodeWithChildren {
    pub node: MaterialNode,
    pub children: Vec<NodeWithChildren>,
}

/// BFS from `root`, collecting every node in the subtree, root first.
pub fn flatten_subtree(root: &NodeWithChildren) -> Vec<MaterialNode> {
    let mut result = Vec::new();
    let mut queue: VecDeque<&NodeWithChildren> = VecDeque::new();
    queue.push_back(root);
    while let Some(current) = queue.pop_front() {
        result.push(current.node.clone());
        for child in &current.children {
            queue.push_back(child);
        }
    }
    result
}

/// BFS across `roots` looking for a node by id.
pub fn find_node_bfs<'a>(
    roots: &'a [NodeWithChildren],
    target_id: Uuid,
) -> Option<&'a NodeWithChildren> {
    let mut queue: VecDeque<&NodeWithChildren> = roots.iter().collect();
    while let Some(current) = queue.pop_front() {
        if current.node.id == target_id {
            return Some(current);
        }
        for child in &current.children {
            queue.push_back(child);
        }
    }
    None
}

/// Resolve a generation target: `node_id = None` flattens every root's
/// subtree (whole course); `Some(id)` flattens just that node's subtree.
///
/// Fails with [`CoreError::NodeNotFound`] when `node_id` is given but
/// absent from `roots`.
pub fn resolve_target_nodes(
    roots: &[NodeWithChildren],
    node_id: Option<Uuid>,
) -> Result<(Option<Uuid>, Vec<MaterialNode>)> {
    match node_id {
        Some(id) => {
            let target = find_node_bfs(roots, id).ok_or(CoreError::NodeNotFound(id))?;
            Ok((Some(id), flatten_subtree(target)))
        }
        None => {
            let mut flat = Vec::new();
            for root in roots {
                flat.extend(flatten_subtree(root));
            }
            Ok((None, flat))
        }
    }
}

/// Serialize a subtree into the nested JSON outline used for `guided`-mode
/// prompts (as opposed to the flat `free`-mode representation, which is
/// just the flat node list itself).
pub fn serialize_guided(roots: &[NodeWithChildren]) -> serde_json::Value {
    fn node_to_value(n: &NodeWithChildren) -> serde_json::Value {
        let mut obj = json!({
            "title": n.node.title,
            "description": n.node.description,
            "order": n.node.order,
        });
        if !n.children.is_empty() {
            let children: Vec<serde_json::Value> =
                n.children.iter().map(node_to_value).collect();
            obj["children"] = serde_json::Value::Array(children);
        }
        obj
    }
    serde_json::Value::Array(roots.iter().map(node_to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Uuid, parent: Option<Uuid>, title: &str) -> MaterialNode {
        MaterialNode {
            id,
            course_id: Uuid::new_v4(),
            parent_id: parent,
            title: title.to_string(),
            description: None,
            order: 0,
            node_fingerprint: None,
        }
    }

    fn leaf(id: Uuid, title: &str) -> NodeWithChildren {
        NodeWithChildren {
            node: node(id, None, title),
            children: Vec::new(),
        }
    }

    #[test]
    fn flatten_is_root_first_bfs() {
        let child_id = Uuid::new_v4();
        let root_id = Uuid::new_v4();
        let tree = NodeWithChildren {
            node: node(root_id, None, "root"),
            children: vec![leaf(child_id, "child")],
        };
        let flat = flatten_subtree(&tree);
        assert_eq!(flat[0].id, root_id);
        assert_eq!(flat[1].id, child_id);
    }

    #[test]
    fn resolve_whole_course_flattens_all_roots() {
        let a = leaf(Uuid::new_v4(), "a");
        let b = leaf(Uuid::new_v4(), "b");
        let (target, flat) = resolve_target_nodes(&[a, b], None).unwrap();
        assert!(target.is_none());
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn resolve_missing_node_fails() {
        let a = leaf(Uuid::new_v4(), "a");
        let err = resolve_target_nodes(&[a], Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound(_)));
    }

    #[test]
    fn serialize_guided_nests_children() {
        let child_id = Uuid::new_v4();
        let tree = NodeWithChildren {
            node: node(Uuid::new_v4(), None, "root"),
            children: vec![leaf(child_id, "child")],
        };
        let value = serialize_guided(std::slice::from_ref(&tree));
        assert!(value[0]["children"].is_array());
    }
}
