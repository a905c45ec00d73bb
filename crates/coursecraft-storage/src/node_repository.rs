//! Material tree persistence and the preloaded [`ParentLookup`] used by
//! conflict detection.

use std::collections::HashMap;

use coursecraft_core::conflict::ParentLookup;
use coursecraft_core::models::{EntryState, MaterialEntry, MaterialNode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// `tenant_id` is optional: `Some` scopes every query to one tenant via a
/// join through `material_nodes → courses` (neither `material_entries`
/// nor `material_nodes` carries a `tenant_id` column), `None` is the
/// system/worker bypass, matching [`crate::LlmCallRepository`]'s
/// convention.
pub struct NodeRepository<'a> {
    pool: &'a PgPool,
    tenant_id: Option<Uuid>,
}

impl<'a> NodeRepository<'a> {
    pub fn new(pool: &'a PgPool, tenant_id: Option<Uuid>) -> Self {
        Self { pool, tenant_id }
    }

    /// Tenant-scoped when constructed with `Some(tenant_id)`: an entry
    /// belonging to a different tenant is reported as
    /// [`StorageError::NotFound`], same as one that doesn't exist.
    pub async fn get_entry_by_id(&self, entry_id: Uuid) -> Result<MaterialEntry> {
        let row = if let Some(tenant_id) = self.tenant_id {
            sqlx::query_as::<_, EntryRow>(
                r#"
                SELECT material_entries.id, material_entries.node_id, material_entries.filename,
                       material_entries.source_url, material_entries.processed_content,
                       material_entries.content_fingerprint, material_entries.state,
                       material_entries.processed_at, material_entries.error_message
                FROM material_entries
                JOIN material_nodes ON material_nodes.id = material_entries.node_id
                JOIN courses ON courses.id = material_nodes.course_id
                WHERE material_entries.id = $1 AND courses.tenant_id = $2
                "#,
            )
            .bind(entry_id)
            .bind(tenant_id)
            .fetch_optional(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, EntryRow>(
                r#"
                SELECT id, node_id, filename, source_url, processed_content,
                       content_fingerprint, state, processed_at, error_message
                FROM material_entries WHERE id = $1
                "#,
            )
            .bind(entry_id)
            .fetch_optional(self.pool)
            .await?
        };
        row.ok_or(StorageError::NotFound(entry_id)).map(Into::into)
    }

    /// Writes back every mutable field of an in-memory [`MaterialEntry`]
    /// after a `coursecraft_core::job_state` entry transition.
    pub async fn persist_entry(&self, entry: &MaterialEntry) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE material_entries
            SET processed_content = $2, content_fingerprint = $3, state = $4,
                processed_at = $5, error_message = $6
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(&entry.processed_content)
        .bind(&entry.content_fingerprint)
        .bind(entry_state_str(entry.state))
        .bind(entry.processed_at)
        .bind(&entry.error_message)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<MaterialNode>> {
        let rows = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT id, course_id, parent_id, title, description, "order", node_fingerprint
            FROM material_nodes WHERE course_id = $1 ORDER BY "order"
            "#,
        )
        .bind(course_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn entries_for_node(&self, node_id: Uuid) -> Result<Vec<MaterialEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, node_id, filename, source_url, processed_content,
                   content_fingerprint, state, processed_at, error_message
            FROM material_entries WHERE node_id = $1
            "#,
        )
        .bind(node_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Loads every `(node_id → parent_id)` edge for a course into memory,
    /// for conflict detection's ancestor walk. `coursecraft-core` stays
    /// free of any database dependency; this is the one place that
    /// bridges the two.
    pub async fn load_parent_lookup(&self, course_id: Uuid) -> Result<InMemoryParentLookup> {
        let rows: Vec<(Uuid, Option<Uuid>)> = sqlx::query_as(
            "SELECT id, parent_id FROM material_nodes WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_all(self.pool)
        .await?;
        let map = rows
            .into_iter()
            .filter_map(|(id, parent)| parent.map(|p| (id, p)))
            .collect();
        Ok(InMemoryParentLookup(map))
    }

    /// Writes a freshly computed `node_fingerprint` back after
    /// `coursecraft_core::fingerprint::ensure_node_fp` ran in memory.
    pub async fn update_node_fingerprint(&self, node_id: Uuid, fingerprint: &str) -> Result<()> {
        sqlx::query("UPDATE material_nodes SET node_fingerprint = $2 WHERE id = $1")
            .bind(node_id)
            .bind(fingerprint)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Clears `node_fingerprint` on `node_id` and every ancestor up to
    /// the root, so the next read recomputes a stale subtree bottom-up
    /// via [`coursecraft_core::fingerprint::ensure_node_fp`]. Any write
    /// that invalidates a node's content must invalidate its whole
    /// ancestor chain, since `ensure_node_fp` folds children into every
    /// parent's digest.
    pub async fn clear_ancestor_fingerprints(&self, node_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            WITH RECURSIVE ancestors AS (
                SELECT id, parent_id FROM material_nodes WHERE id = $1
                UNION ALL
                SELECT n.id, n.parent_id
                FROM material_nodes n
                JOIN ancestors a ON n.id = a.parent_id
            )
            UPDATE material_nodes
            SET node_fingerprint = NULL
            WHERE id IN (SELECT id FROM ancestors)
            "#,
        )
        .bind(node_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// A parent map preloaded for one course. Implements [`ParentLookup`]
/// so `coursecraft_core::conflict::detect_conflict` can walk it without
/// knowing it came from a database.
pub struct InMemoryParentLookup(HashMap<Uuid, Uuid>);

impl ParentLookup for InMemoryParentLookup {
    fn parent_of(&self, node_id: Uuid) -> Option<Uuid> {
        self.0.get(&node_id).copied()
    }
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    id: Uuid,
    course_id: Uuid,
    parent_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    order: i32,
    node_fingerprint: Option<String>,
}

impl From<NodeRow> for MaterialNode {
    fn from(row: NodeRow) -> Self {
        MaterialNode {
            id: row.id,
            course_id: row.course_id,
            parent_id: row.parent_id,
            title: row.title,
            description: row.description,
            order: row.order,
            node_fingerprint: row.node_fingerprint,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    node_id: Uuid,
    filename: String,
    source_url: Option<String>,
    processed_content: Option<String>,
    content_fingerprint: Option<String>,
    state: String,
    processed_at: Option<chrono::DateTime<chrono::Utc>>,
    error_message: Option<String>,
}

impl From<EntryRow> for MaterialEntry {
    fn from(row: EntryRow) -> Self {
        MaterialEntry {
            id: row.id,
            node_id: row.node_id,
            filename: row.filename,
            source_url: row.source_url,
            processed_content: row.processed_content,
            content_fingerprint: row.content_fingerprint,
            state: entry_state_from_str(&row.state),
            processed_at: row.processed_at,
            error_message: row.error_message,
        }
    }
}

fn entry_state_from_str(s: &str) -> EntryState {
    match s {
        "pending" => EntryState::Pending,
        "ready" => EntryState::Ready,
        "error" => EntryState::Error,
        "integrity_broken" => EntryState::IntegrityBroken,
        _ => EntryState::Raw,
    }
}

fn entry_state_str(state: EntryState) -> &'static str {
    match state {
        EntryState::Raw => "raw",
        EntryState::Pending => "pending",
        EntryState::Ready => "ready",
        EntryState::Error => "error",
        EntryState::IntegrityBroken => "integrity_broken",
    }
}
