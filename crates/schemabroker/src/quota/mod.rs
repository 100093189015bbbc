//! Storage quota reconciliation.
//!
//! Measures instance schemas and moves their grantees between full and
//! read/prune-only access. Stateless: every pass recomputes from the catalog.

pub mod enforcer;
pub mod hook;
pub mod measure;
pub mod plan;
pub mod report;
pub mod worker;

pub use enforcer::QuotaReconciler;
pub use hook::{DeferredEnforcement, PrivilegeChangeHook};
pub use measure::{megabytes, SchemaUsage};
pub use plan::{Bucket, ChangeAction, GrantPair, PrivilegeChange};
pub use report::{ChangeFailure, EnforcementReport};
pub use worker::{QuotaWorker, MIN_PERIOD};
