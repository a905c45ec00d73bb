//! API key lifecycle, authenticated tenant context, scope gate, and
//! the rate limiter re-exported from `coursecraft-core` for request-path
//! convenience.

pub mod authenticate;
pub mod context;
pub mod error;
pub mod keys;
pub mod scopes;

pub use authenticate::authenticate;
pub use context::TenantContext;
pub use error::{AuthError, Result};
pub use keys::{generate_api_key, hash_api_key, GeneratedApiKey};
pub use scopes::require_scope;

pub use coursecraft_core::rate_limiter::RateLimiter;
