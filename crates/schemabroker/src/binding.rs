//! Binding lifecycle
//!
//! A binding is one backend user with privileges on one instance schema.
//! The broker keeps no record of which instance a binding belongs to; the
//! grant itself is the only link. That is why existence comes in two tiers:
//!
//! - [`BindingLifecycle::exists_weak`] only asks whether the derived user
//!   exists. It is all a caller holding just a binding id can ask, and it
//!   cannot tell whether the user is scoped to the instance it claims.
//! - [`BindingLifecycle::exists_strong`] probes the INSERT grant on the
//!   instance schema and needs both ids.

use std::collections::BTreeSet;
use std::sync::Arc;

use schemabroker_backend::{
    statements, BackendConfig, BackendResult, Privilege, SessionFactory, SqlSession, FULL_ACCESS,
    WRITE_ACCESS,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::credentials::{generate_password, Credentials};
use crate::error::{BrokerError, BrokerResult, ResourceKind};
use crate::instance::TenantInstance;

/// Backend answers to CREATE USER on an existing user.
const DUPLICATE_USER: [&str; 2] = ["user name already exists", "duplicate user name"];

/// Backend answer to DROP USER on a missing user.
const INVALID_USER: &str = "invalid user name";

/// A binding and the names derived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantBinding {
    pub id: String,
    /// Instance id. Weak reference: the binding does not keep it alive.
    pub instance_id: String,
    pub username: String,
}

impl TenantBinding {
    #[must_use]
    pub fn derive(binding_id: &str, instance: &TenantInstance) -> Self {
        Self {
            id: binding_id.to_string(),
            instance_id: instance.id.clone(),
            username: codec::user_name(binding_id),
        }
    }
}

/// Grant the full privilege set on a schema.
pub(crate) async fn grant_full_access_on(
    session: &mut dyn SqlSession,
    schema: &str,
    grantee: &str,
) -> BackendResult<()> {
    session
        .execute(&statements::grant_on_schema(&FULL_ACCESS, schema, grantee))
        .await
}

/// Revoke the write privileges on a schema, keeping SELECT, DELETE and DROP.
pub(crate) async fn revoke_write_access_on(
    session: &mut dyn SqlSession,
    schema: &str,
    grantee: &str,
) -> BackendResult<()> {
    session
        .execute(&statements::revoke_on_schema(&WRITE_ACCESS, schema, grantee))
        .await
}

/// Create, drop, probe and re-grant binding users.
#[derive(Clone)]
pub struct BindingLifecycle {
    sessions: Arc<dyn SessionFactory>,
    backend: Arc<BackendConfig>,
}

impl BindingLifecycle {
    pub fn new(sessions: Arc<dyn SessionFactory>, backend: Arc<BackendConfig>) -> Self {
        Self { sessions, backend }
    }

    /// Create the binding user, grant it full access on the instance schema
    /// and return its credentials.
    ///
    /// The password exists only in the returned [`Credentials`]. Creating
    /// the same binding twice fails with `AlreadyExists`.
    ///
    /// If the grant fails the user is dropped again so a retry starts clean.
    #[instrument(skip(self, instance), fields(schema = %instance.schema_name))]
    pub async fn create(
        &self,
        binding_id: &str,
        instance: &TenantInstance,
    ) -> BrokerResult<Credentials> {
        let TenantBinding { username, .. } = TenantBinding::derive(binding_id, instance);
        let password = generate_password();
        let mut session = self.sessions.open().await?;

        match session
            .execute(&statements::create_user(&username, &password))
            .await
        {
            Ok(()) => {}
            Err(e) if DUPLICATE_USER.iter().any(|m| e.message_contains(m)) => {
                warn!(username = %username, "Binding user already exists");
                return Err(BrokerError::AlreadyExists {
                    kind: ResourceKind::Binding,
                    name: username,
                });
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) =
            grant_full_access_on(session.as_mut(), &instance.schema_name, &username).await
        {
            warn!(username = %username, error = %e, "Grant failed, dropping binding user");
            if let Err(drop_err) = session
                .execute(&statements::drop_user_cascade(&username))
                .await
            {
                warn!(username = %username, error = %drop_err, "Failed to drop binding user after grant failure");
            }
            return Err(e.into());
        }

        info!(username = %username, "Binding user created");

        Ok(Credentials::render(
            &self.backend,
            &instance.schema_name,
            &username,
            password,
        ))
    }

    /// Drop the binding user and everything it owns. A missing user counts
    /// as success.
    #[instrument(skip(self))]
    pub async fn destroy(&self, binding_id: &str) -> BrokerResult<()> {
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;

        match session
            .execute(&statements::drop_user_cascade(&username))
            .await
        {
            Ok(()) => {
                info!(username = %username, "Binding user dropped");
                Ok(())
            }
            Err(e) if e.message_contains(INVALID_USER) => {
                debug!(username = %username, "Binding user already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a user with the derived name exists, on any schema.
    #[instrument(skip(self))]
    pub async fn exists_weak(&self, binding_id: &str) -> BrokerResult<bool> {
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;
        let count = session
            .query_count(&statements::count_user(&username))
            .await?;
        Ok(count > 0)
    }

    /// Whether the derived user holds INSERT on the instance schema.
    #[instrument(skip(self))]
    pub async fn exists_strong(&self, binding_id: &str, instance_id: &str) -> BrokerResult<bool> {
        let schema = codec::schema_name(instance_id)?;
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;
        let count = session
            .query_count(&statements::count_privilege(
                &schema,
                &username,
                Privilege::Insert,
            ))
            .await?;
        Ok(count > 0)
    }

    /// Privileges the binding user currently holds on the instance schema.
    #[instrument(skip(self))]
    pub async fn privileges(
        &self,
        binding_id: &str,
        instance_id: &str,
    ) -> BrokerResult<BTreeSet<Privilege>> {
        let schema = codec::schema_name(instance_id)?;
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;
        let rows = session
            .query(&statements::list_privileges(&schema, &username))
            .await?;

        let mut privileges = BTreeSet::new();
        for row in &rows {
            let name = row.text(0)?;
            match name.parse::<Privilege>() {
                Ok(privilege) => {
                    privileges.insert(privilege);
                }
                Err(_) => debug!(privilege = %name, "Ignoring non-schema privilege"),
            }
        }
        Ok(privileges)
    }

    /// Grant the full privilege set to the binding user.
    #[instrument(skip(self))]
    pub async fn grant_full_access(&self, binding_id: &str, instance_id: &str) -> BrokerResult<()> {
        let schema = codec::schema_name(instance_id)?;
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;
        grant_full_access_on(session.as_mut(), &schema, &username).await?;
        info!(username = %username, schema = %schema, "Full access granted");
        Ok(())
    }

    /// Revoke write access from the binding user.
    #[instrument(skip(self))]
    pub async fn revoke_write_access(
        &self,
        binding_id: &str,
        instance_id: &str,
    ) -> BrokerResult<()> {
        let schema = codec::schema_name(instance_id)?;
        let username = codec::user_name(binding_id);
        let mut session = self.sessions.open().await?;
        revoke_write_access_on(session.as_mut(), &schema, &username).await?;
        info!(username = %username, schema = %schema, "Write access revoked");
        Ok(())
    }
}
