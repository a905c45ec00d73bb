//! Authenticated tenant context, extracted from an API key and injected
//! into every request handler.

use uuid::Uuid;

/// Immutable per-request identity, resolved once during authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub scopes: Vec<String>,
    pub rate_limit_prep: u32,
    pub rate_limit_check: u32,
    pub key_prefix: String,
}

impl TenantContext {
    /// The rate limiter key for a given scope: `"{tenant}:{scope}"`.
    pub fn rate_limit_key(&self, scope: &str) -> String {
        format!("{}:{}", self.tenant_id, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_key_combines_tenant_and_scope() {
        let tenant_id = Uuid::nil();
        let ctx = TenantContext {
            tenant_id,
            tenant_name: "acme".to_string(),
            scopes: vec!["prep".to_string()],
            rate_limit_prep: 10,
            rate_limit_check: 20,
            key_prefix: "cs_live_abcd".to_string(),
        };
        assert_eq!(ctx.rate_limit_key("prep"), format!("{tenant_id}:prep"));
    }
}
