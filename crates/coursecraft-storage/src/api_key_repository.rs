//! Lookup of persisted [`ApiKey`] rows by their SHA-256 hash, the one
//! query the authentication path runs per request.

use coursecraft_core::models::ApiKey;
use coursecraft_core::NIL_UUID;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};

pub struct ApiKeyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiKeyRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Looked up once per request from the `X-API-Key` header's hash.
    /// `ApiKey` has no surrogate id of its own to key a
    /// [`StorageError::NotFound`] on, so a miss uses [`NIL_UUID`] as the
    /// sentinel, matching [`crate::SnapshotRepository`]'s identity-key
    /// convention for "no single id" not-found cases.
    pub async fn find_by_hash(&self, key_hash: &str) -> Result<ApiKey> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT key_hash, key_prefix, label, scopes, rate_limit_prep,
                   rate_limit_check, is_active, tenant_id
            FROM api_keys WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into).ok_or(StorageError::NotFound(NIL_UUID))
    }

    /// The tenant display name backing `TenantContext::tenant_name`,
    /// fetched separately from `find_by_hash` since `ApiKey` doesn't
    /// carry it.
    pub async fn tenant_name(&self, tenant_id: Uuid) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(self.pool)
            .await?;
        name.ok_or(StorageError::NotFound(tenant_id))
    }
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    key_hash: String,
    key_prefix: String,
    label: String,
    scopes: Vec<String>,
    rate_limit_prep: i32,
    rate_limit_check: i32,
    is_active: bool,
    tenant_id: Uuid,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        ApiKey {
            key_hash: row.key_hash,
            key_prefix: row.key_prefix,
            label: row.label,
            scopes: row.scopes,
            rate_limit_prep: row.rate_limit_prep as u32,
            rate_limit_check: row.rate_limit_check as u32,
            is_active: row.is_active,
            tenant_id: row.tenant_id,
        }
    }
}
