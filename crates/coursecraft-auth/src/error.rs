//! Authentication and authorization errors.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("no API key was presented")]
    MissingKey,

    #[error("API key is invalid or inactive")]
    InvalidKey,

    #[error("requires scope: {0}")]
    MissingScope(String),

    #[error("rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scope_lists_every_option() {
        let err = AuthError::MissingScope("prep or check".to_string());
        assert_eq!(err.to_string(), "requires scope: prep or check");
    }
}
