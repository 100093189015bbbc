//! Privilege change hook
//!
//! Runs after each GRANT or REVOKE the reconciler applies. Privilege changes
//! only bind new sessions: a tenant connected before a revoke keeps writing
//! until it reconnects. A hook is where terminating those sessions would go.

use async_trait::async_trait;
use tracing::{debug, info};

use super::plan::{ChangeAction, PrivilegeChange};

/// Called once per successfully applied privilege change.
#[async_trait]
pub trait PrivilegeChangeHook: Send + Sync {
    async fn privileges_changed(&self, change: &PrivilegeChange);
}

/// Default hook. Leaves live sessions alone; the change takes effect when
/// they reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredEnforcement;

#[async_trait]
impl PrivilegeChangeHook for DeferredEnforcement {
    async fn privileges_changed(&self, change: &PrivilegeChange) {
        match change.action {
            ChangeAction::RevokeWrite => info!(
                grantee = %change.grantee,
                schema = %change.schema,
                "Write access revoked; open sessions keep it until they reconnect"
            ),
            ChangeAction::GrantFull => debug!(
                grantee = %change.grantee,
                schema = %change.schema,
                "Full access granted"
            ),
        }
    }
}
