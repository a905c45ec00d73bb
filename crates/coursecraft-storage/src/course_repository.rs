//! Tenant-scoped CRUD for [`Course`].

use coursecraft_core::models::Course;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Courses scoped to a single tenant. Every read filters by
/// `tenant_id`; `create` stamps it from the constructor rather than
/// trusting a caller-supplied value.
pub struct CourseRepository<'a> {
    pool: &'a PgPool,
    tenant_id: Uuid,
}

impl<'a> CourseRepository<'a> {
    pub fn new(pool: &'a PgPool, tenant_id: Uuid) -> Self {
        Self { pool, tenant_id }
    }

    pub async fn create(&self, title: &str, description: Option<&str>) -> Result<Course> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            INSERT INTO courses (id, tenant_id, title, description, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, now(), now())
            RETURNING id, tenant_id, title, description, created_at, updated_at
            "#,
        )
        .bind(self.tenant_id)
        .bind(title)
        .bind(description)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn get_by_id(&self, course_id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, tenant_id, title, description, created_at, updated_at
            FROM courses
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(course_id)
        .bind(self.tenant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_all(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, tenant_id, title, description, created_at, updated_at
            FROM courses
            WHERE tenant_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(self.tenant_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Loads a course together with its material tree, scoped to the
    /// same tenant as every other read here. The tree itself is
    /// assembled by the caller via [`crate::node_repository`].
    pub async fn get_with_structure(&self, course_id: Uuid) -> Result<Course> {
        self.get_by_id(course_id)
            .await?
            .ok_or(StorageError::NotFound(course_id))
    }

    pub async fn delete(&self, course_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1 AND tenant_id = $2")
            .bind(course_id)
            .bind(self.tenant_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(course_id));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    tenant_id: Uuid,
    title: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            tenant_id: row.tenant_id,
            title: row.title,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
