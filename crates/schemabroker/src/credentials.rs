//! One-time binding credentials.
//!
//! A binding password is generated inside
//! [`BindingLifecycle::create`](crate::binding::BindingLifecycle::create),
//! written to the backend as part of CREATE USER, and returned exactly once
//! inside [`Credentials`]. Nothing logs, caches or re-derives it afterwards.
//! Losing the response loses the secret.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use schemabroker_backend::BackendConfig;
use serde::Serialize;

/// Length of generated passwords.
pub const PASSWORD_LEN: usize = 32;

/// Generate a binding password.
///
/// Alphanumeric only, starts with an uppercase letter and always contains
/// a lowercase letter and a digit so the default password policy accepts it.
///
/// SECURITY: Uses `OsRng` (CSPRNG) for all randomness.
#[must_use]
pub fn generate_password() -> String {
    let mut rng = OsRng;

    let mut body: Vec<char> = Vec::with_capacity(PASSWORD_LEN - 1);
    body.push(char::from(rng.gen_range(b'a'..=b'z')));
    body.push(char::from(rng.gen_range(b'0'..=b'9')));
    body.extend(
        OsRng
            .sample_iter(Alphanumeric)
            .take(PASSWORD_LEN - 3)
            .map(char::from),
    );
    body.shuffle(&mut rng);

    let mut password = String::with_capacity(PASSWORD_LEN);
    password.push(char::from(rng.gen_range(b'A'..=b'Z')));
    password.extend(body);
    password
}

/// Connection details handed to the application that requested a binding.
#[derive(Serialize)]
pub struct Credentials {
    pub hostname: String,
    pub port: u16,
    /// Instance schema name.
    pub name: String,
    pub username: String,
    pub password: String,
    pub uri: String,
    #[serde(rename = "jdbcUrl")]
    pub jdbc_url: String,
    pub dsn: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("dsn", &self.dsn)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Assemble credentials for a user on an instance schema.
    pub(crate) fn render(
        backend: &BackendConfig,
        schema: &str,
        username: &str,
        password: String,
    ) -> Self {
        let tail = format!(
            "{username}:{password}@{}:{}/{schema}?currentschema={schema}",
            backend.host, backend.port
        );

        Self {
            hostname: backend.host.clone(),
            port: backend.port,
            name: schema.to_string(),
            username: username.to_string(),
            uri: format!("sap://{tail}"),
            jdbc_url: format!("jdbc:sap://{tail}"),
            dsn: backend.dsn.clone(),
            password,
        }
    }

    /// Body of a successful bind response: `{"credentials": {...}}`.
    #[must_use]
    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({ "credentials": self })
    }
}
