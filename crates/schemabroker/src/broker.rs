//! Broker facade
//!
//! The four calls the HTTP layer makes, each mapped onto the lifecycles
//! with the admission check and the existence checks that decide between
//! success and a typed miss.

use std::sync::Arc;
use std::time::Duration;

use schemabroker_backend::SessionFactory;
use serde::Serialize;
use tracing::{info, instrument};

use crate::binding::BindingLifecycle;
use crate::config::BrokerConfig;
use crate::credentials::Credentials;
use crate::error::{BrokerError, BrokerResult};
use crate::instance::{InstanceLifecycle, TenantInstance};
use crate::quota::{PrivilegeChangeHook, QuotaReconciler, QuotaWorker};

/// Answer to a provision call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedInstance {
    pub schema_name: String,
    pub dashboard_url: String,
}

/// Outcome of a deprovision or unbind call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
}

/// Entry point for the HTTP layer.
#[derive(Clone)]
pub struct Broker {
    config: Arc<BrokerConfig>,
    instances: InstanceLifecycle,
    bindings: BindingLifecycle,
    reconciler: QuotaReconciler,
}

impl Broker {
    pub fn new(config: BrokerConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        info!(
            backend = ?config.backend,
            quota = ?config.quota,
            interval_secs = config.enforcement_interval_secs,
            "Initializing schema broker"
        );
        let backend = Arc::new(config.backend.clone());
        Self {
            instances: InstanceLifecycle::new(Arc::clone(&sessions)),
            bindings: BindingLifecycle::new(Arc::clone(&sessions), backend),
            reconciler: QuotaReconciler::new(sessions, config.quota.clone()),
            config: Arc::new(config),
        }
    }

    /// Replace the hook the reconciler calls after each privilege change.
    #[must_use]
    pub fn with_privilege_hook(mut self, hook: Arc<dyn PrivilegeChangeHook>) -> Self {
        self.reconciler = self.reconciler.with_hook(hook);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    #[must_use]
    pub fn instances(&self) -> &InstanceLifecycle {
        &self.instances
    }

    #[must_use]
    pub fn bindings(&self) -> &BindingLifecycle {
        &self.bindings
    }

    #[must_use]
    pub fn reconciler(&self) -> &QuotaReconciler {
        &self.reconciler
    }

    /// Worker running the reconciler on the configured interval.
    #[must_use]
    pub fn quota_worker(&self) -> QuotaWorker {
        QuotaWorker::new(
            self.reconciler.clone(),
            Duration::from_secs(self.config.enforcement_interval_secs),
        )
    }

    /// Provision an instance.
    ///
    /// Rejected with `AdmissionRejected` once the number of instance schemas
    /// reaches the configured maximum.
    #[instrument(skip(self))]
    pub async fn provision_instance(&self, instance_id: &str) -> BrokerResult<ProvisionedInstance> {
        TenantInstance::derive(instance_id)?;

        if let Some(limit) = self.config.quota.max_instances {
            let existing = self.instances.count_existing_instances().await?;
            if existing >= limit {
                info!(existing, limit, "Instance admission rejected");
                return Err(BrokerError::AdmissionRejected { existing, limit });
            }
        }

        let instance = self.instances.create(instance_id).await?;

        Ok(ProvisionedInstance {
            dashboard_url: self.dashboard_url(&instance),
            schema_name: instance.schema_name,
        })
    }

    /// Deprovision an instance, dropping its schema with everything in it.
    #[instrument(skip(self))]
    pub async fn deprovision_instance(&self, instance_id: &str) -> BrokerResult<Removal> {
        if !self.instances.exists(instance_id).await? {
            return Ok(Removal::NotFound);
        }
        self.instances.destroy(instance_id).await?;
        Ok(Removal::Deleted)
    }

    /// Bind an existing instance and return one-time credentials.
    #[instrument(skip(self))]
    pub async fn bind_instance(
        &self,
        binding_id: &str,
        instance_id: &str,
    ) -> BrokerResult<Credentials> {
        let instance = self.instances.find(instance_id).await?;
        self.bindings.create(binding_id, &instance).await
    }

    /// Unbind. Existence is decided by the weak check; the instance id is
    /// not consulted.
    #[instrument(skip(self))]
    pub async fn unbind_instance(&self, binding_id: &str, instance_id: &str) -> BrokerResult<Removal> {
        if !self.bindings.exists_weak(binding_id).await? {
            return Ok(Removal::NotFound);
        }
        self.bindings.destroy(binding_id).await?;
        Ok(Removal::Deleted)
    }

    fn dashboard_url(&self, instance: &TenantInstance) -> String {
        format!(
            "{}/instances/{}",
            self.config.dashboard_url.trim_end_matches('/'),
            instance.id
        )
    }
}
