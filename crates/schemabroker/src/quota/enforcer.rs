//! Quota reconciler
//!
//! One pass:
//! 1. Measure storage for every instance schema.
//! 2. List the broker-managed grantees on those schemas.
//! 3. Partition schemas against the threshold and plan one change per pair.
//! 4. Revoke write access from violators, grant full access to the rest.
//!
//! Each change is applied independently. A refused GRANT or REVOKE is
//! recorded in the report and the pass moves on; the next pass retries it.
//! Failures while measuring or listing abort the pass before any change.

use std::sync::Arc;

use rust_decimal::Decimal;
use schemabroker_backend::{statements, SessionFactory};
use tracing::{info, instrument, warn};

use super::hook::{DeferredEnforcement, PrivilegeChangeHook};
use super::measure::parse_usage;
use super::plan::{parse_pairs, plan, ChangeAction};
use super::report::EnforcementReport;
use crate::binding::{grant_full_access_on, revoke_write_access_on};
use crate::codec::{INSTANCE_PREFIX, USER_PREFIX};
use crate::config::QuotaPolicy;
use crate::error::{BrokerError, BrokerResult};

/// Reconciles binding privileges against measured storage.
#[derive(Clone)]
pub struct QuotaReconciler {
    sessions: Arc<dyn SessionFactory>,
    policy: QuotaPolicy,
    hook: Arc<dyn PrivilegeChangeHook>,
}

impl QuotaReconciler {
    /// Reconciler with the [`DeferredEnforcement`] hook.
    pub fn new(sessions: Arc<dyn SessionFactory>, policy: QuotaPolicy) -> Self {
        Self {
            sessions,
            policy,
            hook: Arc::new(DeferredEnforcement),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PrivilegeChangeHook>) -> Self {
        self.hook = hook;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// `ConfigurationMissing` when no storage limit is configured, before
    /// any session is opened. Backend errors from measuring or listing.
    #[instrument(skip(self))]
    pub async fn enforce(&self) -> BrokerResult<EnforcementReport> {
        let max_storage_mb = self
            .policy
            .max_storage_mb
            .map(Decimal::from)
            .ok_or(BrokerError::ConfigurationMissing {
                key: "max_storage_mb",
            })?;

        let mut report = EnforcementReport::begin(max_storage_mb);
        info!(run_id = %report.run_id, max_storage_mb = %max_storage_mb, "Starting quota enforcement");

        let mut session = self.sessions.open().await?;

        let usage_rows = session
            .query(&statements::storage_by_schema_prefix(INSTANCE_PREFIX))
            .await?;
        let usages = parse_usage(&usage_rows)?;

        let pair_rows = session
            .query(&statements::list_grantees(INSTANCE_PREFIX, USER_PREFIX))
            .await?;
        let pairs = parse_pairs(&pair_rows)?;

        let plan = plan(&usages, &pairs, max_storage_mb);
        report.record_plan(&plan);

        for change in &plan.changes {
            let applied = match change.action {
                ChangeAction::RevokeWrite => {
                    revoke_write_access_on(session.as_mut(), &change.schema, &change.grantee).await
                }
                ChangeAction::GrantFull => {
                    grant_full_access_on(session.as_mut(), &change.schema, &change.grantee).await
                }
            };

            match applied {
                Ok(()) => {
                    report.record_applied(change);
                    self.hook.privileges_changed(change).await;
                }
                Err(e) => {
                    warn!(
                        grantee = %change.grantee,
                        schema = %change.schema,
                        action = ?change.action,
                        error = %e,
                        "Privilege change failed"
                    );
                    report.record_failure(change, &e);
                }
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            violators = report.violators.len(),
            compliant = report.compliant.len(),
            revoked = report.revoked,
            granted = report.granted,
            failures = report.failures.len(),
            "Quota enforcement finished"
        );

        Ok(report)
    }
}
