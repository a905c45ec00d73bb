//! Errors raised while loading or persisting through a repository.

use thiserror::Error;
use uuid::Uuid;

/// Repository-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The row exists but belongs to a different tenant, or doesn't
    /// exist at all; repositories don't distinguish the two to avoid
    /// leaking existence across tenants.
    #[error("not found: {0}")]
    NotFound(Uuid),

    /// A `sqlx` driver or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A domain-level invariant rejected the operation (bad state
    /// transition, conflicting generation, etc).
    #[error(transparent)]
    Core(#[from] coursecraft_core::CoreError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_includes_id() {
        let id = Uuid::nil();
        let err = StorageError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
