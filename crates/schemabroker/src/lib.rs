//! # Schema Broker
//!
//! Per-tenant schemas and credentials on a shared SQL server, with storage
//! quota reconciliation.
//!
//! The broker stores nothing of its own. Every answer comes from the
//! server's catalog, and every object it manages is found again by name:
//! instance schemas carry the `CFS_` prefix, binding users the `CFU_` prefix.
//!
//! ## Crate Organization
//!
//! - [`codec`] - Schema and user names derived from platform ids
//! - [`instance`] - Instance schema lifecycle
//! - [`binding`] - Binding user lifecycle and two-tier existence checks
//! - [`credentials`] - One-time passwords and connection strings
//! - [`quota`] - Storage measurement, reconciliation and the scheduled worker
//! - [`broker`] - Provision/bind/unbind/deprovision facade
//! - [`config`] - Environment configuration
//! - [`logging`] - Subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use schemabroker::{Broker, BrokerConfig};
//!
//! let config = BrokerConfig::from_env()?;
//! schemabroker::logging::init_logging(&config.rust_log)?;
//!
//! let broker = Broker::new(config, Arc::new(my_session_factory));
//! let provisioned = broker.provision_instance("instance-1").await?;
//! let credentials = broker.bind_instance("binding-1", "instance-1").await?;
//!
//! let worker = broker.quota_worker();
//! tokio::spawn(async move { worker.run().await });
//! ```

pub mod binding;
pub mod broker;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod instance;
pub mod logging;
pub mod quota;

pub use binding::{BindingLifecycle, TenantBinding};
pub use broker::{Broker, ProvisionedInstance, Removal};
pub use config::{BrokerConfig, ConfigError, QuotaPolicy};
pub use credentials::Credentials;
pub use error::{BrokerError, BrokerResult, ResourceKind};
pub use instance::{InstanceLifecycle, TenantInstance};
pub use quota::{EnforcementReport, QuotaReconciler, QuotaWorker};
