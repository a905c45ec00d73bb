//! Scope enforcement over an already-authenticated [`TenantContext`].

use crate::context::TenantContext;
use crate::error::{AuthError, Result};

/// Admits on any overlap between `required_scopes` and the tenant's
/// own scopes; rejects only when none match.
pub fn require_scope(tenant: &TenantContext, required_scopes: &[&str]) -> Result<()> {
    let admitted = required_scopes.iter().any(|s| tenant.scopes.iter().any(|owned| owned == s));
    if admitted {
        Ok(())
    } else {
        Err(AuthError::MissingScope(required_scopes.join(" or ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tenant(scopes: &[&str]) -> TenantContext {
        TenantContext {
            tenant_id: Uuid::nil(),
            tenant_name: "acme".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            rate_limit_prep: 10,
            rate_limit_check: 20,
            key_prefix: "cs_live_abcd".to_string(),
        }
    }

    #[test]
    fn admits_on_any_overlap() {
        let tenant = tenant(&["prep"]);
        assert!(require_scope(&tenant, &["prep", "check"]).is_ok());
    }

    #[test]
    fn rejects_when_no_scope_matches() {
        let tenant = tenant(&["check"]);
        let err = require_scope(&tenant, &["prep"]).unwrap_err();
        assert!(matches!(err, AuthError::MissingScope(_)));
    }
}
