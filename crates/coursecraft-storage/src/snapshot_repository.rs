//! Content-addressed lookup and creation of [`CourseStructureSnapshot`]
//! rows. Identity is `(course_id, node_id.unwrap_or(NIL), node_fingerprint,
//! mode)`.

use coursecraft_core::models::CourseStructureSnapshot;
use coursecraft_core::NIL_UUID;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// `tenant_id` is optional: `Some` scopes every query to one tenant via a
/// join through `courses` (`course_structure_snapshots` carries no
/// `tenant_id` column of its own), `None` is the system/worker bypass,
/// matching [`crate::LlmCallRepository`]'s convention.
pub struct SnapshotRepository<'a> {
    pool: &'a PgPool,
    tenant_id: Option<Uuid>,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(pool: &'a PgPool, tenant_id: Option<Uuid>) -> Self {
        Self { pool, tenant_id }
    }

    /// Looked up before every router invocation. A hit lets the caller
    /// skip generation entirely.
    pub async fn find_by_identity(
        &self,
        course_id: Uuid,
        node_id: Option<Uuid>,
        node_fingerprint: &str,
        mode: &str,
    ) -> Result<Option<CourseStructureSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT id, course_id, node_id, node_fingerprint, mode, structure,
                   prompt_version, model_id, tokens_in, tokens_out, cost_usd, created_at
            FROM course_structure_snapshots
            WHERE course_id = $1
              AND coalesce(node_id, $4) = coalesce($2, $4)
              AND node_fingerprint = $3
              AND mode = $5
            "#,
        )
        .bind(course_id)
        .bind(node_id)
        .bind(node_fingerprint)
        .bind(NIL_UUID)
        .bind(mode)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(
        &self,
        course_id: Uuid,
        node_id: Option<Uuid>,
        node_fingerprint: &str,
        mode: &str,
        structure: serde_json::Value,
        prompt_version: &str,
        model_id: &str,
        tokens_in: Option<u32>,
        tokens_out: Option<u32>,
        cost_usd: Option<f64>,
    ) -> Result<CourseStructureSnapshot> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            INSERT INTO course_structure_snapshots (
                id, course_id, node_id, node_fingerprint, mode, structure,
                prompt_version, model_id, tokens_in, tokens_out, cost_usd, created_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            RETURNING id, course_id, node_id, node_fingerprint, mode, structure,
                      prompt_version, model_id, tokens_in, tokens_out, cost_usd, created_at
            "#,
        )
        .bind(course_id)
        .bind(node_id)
        .bind(node_fingerprint)
        .bind(mode)
        .bind(structure)
        .bind(prompt_version)
        .bind(model_id)
        .bind(tokens_in.map(|v| v as i32))
        .bind(tokens_out.map(|v| v as i32))
        .bind(cost_usd)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Tenant-scoped when constructed with `Some(tenant_id)`: a snapshot
    /// belonging to a different tenant is reported as
    /// [`StorageError::NotFound`], same as one that doesn't exist.
    pub async fn get_by_id(&self, snapshot_id: Uuid) -> Result<CourseStructureSnapshot> {
        let row = if let Some(tenant_id) = self.tenant_id {
            sqlx::query_as::<_, SnapshotRow>(
                r#"
                SELECT course_structure_snapshots.id, course_structure_snapshots.course_id,
                       course_structure_snapshots.node_id, course_structure_snapshots.node_fingerprint,
                       course_structure_snapshots.mode, course_structure_snapshots.structure,
                       course_structure_snapshots.prompt_version, course_structure_snapshots.model_id,
                       course_structure_snapshots.tokens_in, course_structure_snapshots.tokens_out,
                       course_structure_snapshots.cost_usd, course_structure_snapshots.created_at
                FROM course_structure_snapshots
                JOIN courses ON courses.id = course_structure_snapshots.course_id
                WHERE course_structure_snapshots.id = $1 AND courses.tenant_id = $2
                "#,
            )
            .bind(snapshot_id)
            .bind(tenant_id)
            .fetch_optional(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, SnapshotRow>(
                r#"
                SELECT id, course_id, node_id, node_fingerprint, mode, structure,
                       prompt_version, model_id, tokens_in, tokens_out, cost_usd, created_at
                FROM course_structure_snapshots WHERE id = $1
                "#,
            )
            .bind(snapshot_id)
            .fetch_optional(self.pool)
            .await?
        };
        row.map(Into::into).ok_or(StorageError::NotFound(snapshot_id))
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    course_id: Uuid,
    node_id: Option<Uuid>,
    node_fingerprint: String,
    mode: String,
    structure: serde_json::Value,
    prompt_version: String,
    model_id: String,
    tokens_in: Option<i32>,
    tokens_out: Option<i32>,
    cost_usd: Option<f64>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SnapshotRow> for CourseStructureSnapshot {
    fn from(row: SnapshotRow) -> Self {
        CourseStructureSnapshot {
            id: row.id,
            course_id: row.course_id,
            node_id: row.node_id,
            node_fingerprint: row.node_fingerprint,
            mode: row.mode,
            structure: row.structure,
            prompt_version: row.prompt_version,
            model_id: row.model_id,
            tokens_in: row.tokens_in.map(|v| v as u32),
            tokens_out: row.tokens_out.map(|v| v as u32),
            cost_usd: row.cost_usd,
            created_at: row.created_at,
        }
    }
}
