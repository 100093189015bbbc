//! Enforcement run report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::plan::{ChangeAction, Plan, PrivilegeChange};

/// A privilege change that the backend refused.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeFailure {
    pub grantee: String,
    pub schema: String,
    pub action: ChangeAction,
    pub error: String,
}

/// Result of one `enforce()` pass.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementReport {
    /// Run ID.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Threshold the pass ran against.
    pub max_storage_mb: Decimal,
    /// Measured usage per schema in MB.
    pub usage: BTreeMap<String, Decimal>,
    pub violators: Vec<String>,
    pub compliant: Vec<String>,
    /// Pairs whose write access was revoked.
    pub revoked: u32,
    /// Pairs granted the full set.
    pub granted: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ChangeFailure>,
}

impl EnforcementReport {
    /// Start a report for a pass.
    #[must_use]
    pub fn begin(max_storage_mb: Decimal) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            max_storage_mb,
            usage: BTreeMap::new(),
            violators: Vec::new(),
            compliant: Vec::new(),
            revoked: 0,
            granted: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_plan(&mut self, plan: &Plan) {
        self.usage = plan.usage.clone();
        self.violators = plan.violators.clone();
        self.compliant = plan.compliant.clone();
    }

    pub(crate) fn record_applied(&mut self, change: &PrivilegeChange) {
        match change.action {
            ChangeAction::RevokeWrite => self.revoked += 1,
            ChangeAction::GrantFull => self.granted += 1,
        }
    }

    pub(crate) fn record_failure(&mut self, change: &PrivilegeChange, error: impl ToString) {
        self.failures.push(ChangeFailure {
            grantee: change.grantee.clone(),
            schema: change.schema.clone(),
            action: change.action,
            error: error.to_string(),
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether every planned change was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Wall time of the pass, if finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
