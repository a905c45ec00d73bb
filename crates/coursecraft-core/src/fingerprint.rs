//! Bottom-up Merkle fingerprinting over a material subtree.
//!
//! These functions operate on an in-memory, already-loaded subtree and
//! mutate the cached fingerprint fields in place; persisting the mutated
//! rows back to storage is the caller's responsibility (typically inside
//! the same session/transaction that loaded the tree, per the lazy-cache
//! invalidation contract).

use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::models::MaterialEntry;

/// An in-memory material node together with its entries and children,
/// eagerly loaded so fingerprinting never triggers further I/O.
#[derive(Debug, Clone)]
pub struct NodeTree {
    pub node_id: uuid::Uuid,
    pub node_fingerprint: Option<String>,
    pub entries: Vec<MaterialEntry>,
    pub children: Vec<NodeTree>,
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Return the cached fingerprint, or compute
/// `sha256_hex(processed_content)`, cache it on the entry, and return it.
///
/// Fails with [`CoreError::UnprocessedEntry`] if `processed_content` is
/// still `None`.
pub fn ensure_material_fp(entry: &mut MaterialEntry) -> Result<String> {
    if let Some(fp) = &entry.content_fingerprint {
        return Ok(fp.clone());
    }
    let content = entry
        .processed_content
        .as_ref()
        .ok_or(CoreError::UnprocessedEntry(entry.id))?;
    let fp = sha256_hex(content);
    entry.content_fingerprint = Some(fp.clone());
    Ok(fp)
}

/// Return the cached node fingerprint, or compute it bottom-up: recurse
/// into children first, collect `"m:<fp>"` for every entry with processed
/// content and `"n:<fp>"` for every child, sort, join with `\n`, hash.
///
/// Entries without processed content are skipped entirely — the
/// fingerprint reflects only ready content, so ingesting new material
/// changes the root fingerprint even if nothing else does.
pub fn ensure_node_fp(node: &mut NodeTree) -> Result<String> {
    if let Some(fp) = &node.node_fingerprint {
        return Ok(fp.clone());
    }

    let mut parts = Vec::new();
    for entry in &mut node.entries {
        if entry.processed_content.is_some() {
            let fp = ensure_material_fp(entry)?;
            parts.push(format!("m:{fp}"));
        }
    }
    for child in &mut node.children {
        let fp = ensure_node_fp(child)?;
        parts.push(format!("n:{fp}"));
    }

    parts.sort();
    let digest = sha256_hex(&parts.join("\n"));
    node.node_fingerprint = Some(digest.clone());
    Ok(digest)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::models::EntryState;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn entry_with(content: String) -> MaterialEntry {
        MaterialEntry {
            id: Uuid::new_v4(),
            node_id: Uuid::new_v4(),
            filename: "f".to_string(),
            source_url: None,
            processed_content: Some(content),
            content_fingerprint: None,
            state: EntryState::Ready,
            processed_at: None,
            error_message: None,
        }
    }

    proptest! {
        /// Any permutation of a fixed set of processed entries yields the
        /// same node fingerprint, since `ensure_node_fp` sorts its parts
        /// before hashing.
        #[test]
        fn node_fp_is_invariant_under_sibling_permutation(
            contents in prop::collection::vec("[a-z]{1,12}", 1..8),
            seed in 0u64..10_000,
        ) {
            let mut original: Vec<MaterialEntry> =
                contents.iter().cloned().map(entry_with).collect();
            let mut shuffled = original.clone();

            // Deterministic pseudo-shuffle so the proptest shrinker stays
            // reproducible without pulling in a dedicated RNG dependency.
            let n = shuffled.len();
            for i in 0..n {
                let j = ((seed as usize).wrapping_add(i * 2654435761)) % n;
                shuffled.swap(i, j);
            }

            let mut a = NodeTree { node_id: Uuid::new_v4(), node_fingerprint: None, entries: original.drain(..).collect(), children: Vec::new() };
            let mut b = NodeTree { node_id: Uuid::new_v4(), node_fingerprint: None, entries: shuffled, children: Vec::new() };

            prop_assert_eq!(ensure_node_fp(&mut a).unwrap(), ensure_node_fp(&mut b).unwrap());
        }

        /// Fingerprinting the same content twice always yields the same
        /// digest, independent of the entry's own identity (`id`/`node_id`).
        #[test]
        fn material_fp_depends_only_on_content(content in "[a-z]{0,40}") {
            let mut e1 = entry_with(content.clone());
            let mut e2 = entry_with(content);
            prop_assert_eq!(
                ensure_material_fp(&mut e1).unwrap(),
                ensure_material_fp(&mut e2).unwrap()
            );
        }
    }
}
