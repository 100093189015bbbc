//! Instance lifecycle
//!
//! A tenant instance is one schema on the shared server. Nothing about it is
//! stored by the broker: existence is a catalog lookup, every time.

use std::sync::Arc;

use rust_decimal::Decimal;
use schemabroker_backend::{statements, SessionFactory};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::codec::{self, INSTANCE_PREFIX};
use crate::error::{BrokerError, BrokerResult};
use crate::quota::measure::megabytes;

/// Backend answer to CREATE SCHEMA on an existing schema.
const DUPLICATE_SCHEMA: &str = "cannot use duplicate schema name";

/// Backend answer to DROP SCHEMA on a missing schema.
const INVALID_SCHEMA: &str = "invalid schema name";

/// A tenant instance and its derived schema name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantInstance {
    /// Platform-supplied instance id.
    pub id: String,
    /// `CFS_` + normalized id.
    pub schema_name: String,
}

impl TenantInstance {
    /// Derive the instance for an id. Does not touch the backend.
    pub fn derive(instance_id: &str) -> BrokerResult<Self> {
        Ok(Self {
            id: instance_id.to_string(),
            schema_name: codec::schema_name(instance_id)?,
        })
    }
}

/// Create, drop and look up instance schemas.
#[derive(Clone)]
pub struct InstanceLifecycle {
    sessions: Arc<dyn SessionFactory>,
}

impl InstanceLifecycle {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }

    /// Create the instance schema. An existing schema counts as success.
    #[instrument(skip(self))]
    pub async fn create(&self, instance_id: &str) -> BrokerResult<TenantInstance> {
        let instance = TenantInstance::derive(instance_id)?;
        let mut session = self.sessions.open().await?;

        match session
            .execute(&statements::create_schema(&instance.schema_name))
            .await
        {
            Ok(()) => {
                info!(schema = %instance.schema_name, "Instance schema created");
            }
            Err(e) if e.message_contains(DUPLICATE_SCHEMA) => {
                debug!(schema = %instance.schema_name, "Instance schema already exists");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(instance)
    }

    /// Drop the instance schema and everything in it. A missing schema
    /// counts as success.
    #[instrument(skip(self))]
    pub async fn destroy(&self, instance_id: &str) -> BrokerResult<()> {
        let instance = TenantInstance::derive(instance_id)?;
        let mut session = self.sessions.open().await?;

        match session
            .execute(&statements::drop_schema_cascade(&instance.schema_name))
            .await
        {
            Ok(()) => {
                info!(schema = %instance.schema_name, "Instance schema dropped");
                Ok(())
            }
            Err(e) if e.message_contains(INVALID_SCHEMA) => {
                debug!(schema = %instance.schema_name, "Instance schema already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the instance schema exists right now.
    #[instrument(skip(self))]
    pub async fn exists(&self, instance_id: &str) -> BrokerResult<bool> {
        let instance = TenantInstance::derive(instance_id)?;
        let mut session = self.sessions.open().await?;
        let count = session
            .query_count(&statements::count_schema(&instance.schema_name))
            .await?;
        Ok(count > 0)
    }

    /// Look up an instance, `None` when its schema does not exist.
    pub async fn find_optional(&self, instance_id: &str) -> BrokerResult<Option<TenantInstance>> {
        if self.exists(instance_id).await? {
            Ok(Some(TenantInstance::derive(instance_id)?))
        } else {
            Ok(None)
        }
    }

    /// Look up an instance, `NotFound` when its schema does not exist.
    pub async fn find(&self, instance_id: &str) -> BrokerResult<TenantInstance> {
        self.find_optional(instance_id)
            .await?
            .ok_or_else(|| BrokerError::instance_not_found(instance_id))
    }

    /// Number of schemas carrying the instance prefix.
    #[instrument(skip(self))]
    pub async fn count_existing_instances(&self) -> BrokerResult<u64> {
        let mut session = self.sessions.open().await?;
        let count = session
            .query_count(&statements::count_schemas_with_prefix(INSTANCE_PREFIX))
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Storage used by the instance schema in MB, one decimal.
    /// A schema without tables uses 0.0.
    #[instrument(skip(self))]
    pub async fn storage_usage(&self, instance_id: &str) -> BrokerResult<Decimal> {
        let instance = TenantInstance::derive(instance_id)?;
        let mut session = self.sessions.open().await?;
        let rows = session
            .query(&statements::storage_of_schema(&instance.schema_name))
            .await?;

        let bytes = match rows.first() {
            Some(row) => row.decimal(1)?,
            None => Decimal::ZERO,
        };

        Ok(megabytes(bytes))
    }
}
