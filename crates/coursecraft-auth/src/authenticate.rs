//! Resolves an incoming `X-API-Key` header value into a [`TenantContext`].

use coursecraft_storage::ApiKeyRepository;
use sqlx::PgPool;

use crate::context::TenantContext;
use crate::error::{AuthError, Result};
use crate::keys::hash_api_key;

/// Hashes `raw_key`, looks it up by hash, and rejects an inactive key —
/// same outcome as a key that doesn't exist at all, so neither case
/// leaks which is true to the caller.
pub async fn authenticate(pool: &PgPool, raw_key: &str) -> Result<TenantContext> {
    let repo = ApiKeyRepository::new(pool);
    let key_hash = hash_api_key(raw_key);

    let api_key = repo.find_by_hash(&key_hash).await.map_err(|_| AuthError::InvalidKey)?;
    if !api_key.is_active {
        return Err(AuthError::InvalidKey);
    }

    let tenant_name = repo
        .tenant_name(api_key.tenant_id)
        .await
        .map_err(|_| AuthError::InvalidKey)?;

    Ok(TenantContext {
        tenant_id: api_key.tenant_id,
        tenant_name,
        scopes: api_key.scopes,
        rate_limit_prep: api_key.rate_limit_prep,
        rate_limit_check: api_key.rate_limit_check,
        key_prefix: api_key.key_prefix,
    })
}
