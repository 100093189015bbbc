//! Identifier codec
//!
//! Derives backend object names from the opaque ids the platform hands us.
//! Both derivations are pure: no randomness, no backend call.
//!
//! - Schema names keep the instance id readable: `CFS_` + id uppercased
//!   with `-` mapped to `_`. Ids outside `[0-9a-zA-Z$-]+` are rejected,
//!   which keeps them safe to splice into DDL.
//! - User names must fit the backend's 16 character limit, so they are a
//!   truncated digest of the binding id: `CFU_` + 12 uppercase alphanumerics.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{BrokerError, BrokerResult};

/// Prefix of every instance schema. Prefix scans over the catalog rely on it.
pub const INSTANCE_PREFIX: &str = "CFS_";

/// Prefix of every binding user.
pub const USER_PREFIX: &str = "CFU_";

/// Backend limit for user names.
pub const MAX_USER_NAME_LEN: usize = 16;

/// Backend limit for schema names.
pub const MAX_SCHEMA_NAME_LEN: usize = 127;

const USER_DIGEST_LEN: usize = MAX_USER_NAME_LEN - USER_PREFIX.len();

fn is_allowed_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '$' || c == '-'
}

/// Uppercase and map `-` to `_`.
#[must_use]
pub fn normalize(id: &str) -> String {
    id.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// Check an instance id against `[0-9a-zA-Z$-]+`.
pub fn validate_instance_id(instance_id: &str) -> BrokerResult<()> {
    if instance_id.is_empty() {
        return Err(BrokerError::invalid_identifier(instance_id, "id is empty"));
    }

    if let Some(bad) = instance_id.chars().find(|c| !is_allowed_id_char(*c)) {
        return Err(BrokerError::invalid_identifier(
            instance_id,
            format!("character {bad:?} is not allowed, ids must match [0-9a-zA-Z$-]+"),
        ));
    }

    if INSTANCE_PREFIX.len() + instance_id.len() > MAX_SCHEMA_NAME_LEN {
        return Err(BrokerError::invalid_identifier(
            instance_id,
            format!("derived schema name exceeds {MAX_SCHEMA_NAME_LEN} characters"),
        ));
    }

    Ok(())
}

/// Schema name for an instance id.
pub fn schema_name(instance_id: &str) -> BrokerResult<String> {
    validate_instance_id(instance_id)?;
    Ok(format!("{INSTANCE_PREFIX}{}", normalize(instance_id)))
}

/// User name for a binding id.
///
/// Same input, same name. Different inputs collide only if the first 12
/// alphanumerics of their SHA-256 digests match case-insensitively.
#[must_use]
pub fn user_name(binding_id: &str) -> String {
    let digest = Sha256::digest(binding_id.as_bytes());
    let encoded = STANDARD.encode(digest);

    // base64 of 32 bytes always has far more than 12 alphanumerics; the hex
    // tail only makes the function total.
    let hex_tail: String = digest.iter().map(|b| format!("{b:02X}")).collect();
    let body: String = encoded
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .chain(hex_tail.chars())
        .take(USER_DIGEST_LEN)
        .collect::<String>()
        .to_ascii_uppercase();

    format!("{USER_PREFIX}{body}")
}
