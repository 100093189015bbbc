//! Schema privilege model
//!
//! Schema-level privileges as they appear in `GRANT ... ON SCHEMA` and in the
//! `PRIVILEGE` column of `SYS.GRANTED_PRIVILEGES`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A schema privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    Alter,
    CreateAny,
    Debug,
    Delete,
    Drop,
    Execute,
    Index,
    Insert,
    References,
    Select,
    Trigger,
    Update,
}

/// Everything a bound user receives on its instance schema.
pub const FULL_ACCESS: [Privilege; 12] = [
    Privilege::Alter,
    Privilege::CreateAny,
    Privilege::Debug,
    Privilege::Delete,
    Privilege::Drop,
    Privilege::Execute,
    Privilege::Index,
    Privilege::Insert,
    Privilege::References,
    Privilege::Select,
    Privilege::Trigger,
    Privilege::Update,
];

/// Privileges withdrawn from a schema that is over its storage quota.
///
/// `SELECT`, `DELETE` and `DROP` stay granted so the tenant can read and
/// prune its way back under the limit.
pub const WRITE_ACCESS: [Privilege; 9] = [
    Privilege::Alter,
    Privilege::CreateAny,
    Privilege::Debug,
    Privilege::Execute,
    Privilege::Index,
    Privilege::Insert,
    Privilege::References,
    Privilege::Trigger,
    Privilege::Update,
];

impl Privilege {
    /// Keyword(s) used in GRANT/REVOKE and in the grant catalog.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Privilege::Alter => "ALTER",
            Privilege::CreateAny => "CREATE ANY",
            Privilege::Debug => "DEBUG",
            Privilege::Delete => "DELETE",
            Privilege::Drop => "DROP",
            Privilege::Execute => "EXECUTE",
            Privilege::Index => "INDEX",
            Privilege::Insert => "INSERT",
            Privilege::References => "REFERENCES",
            Privilege::Select => "SELECT",
            Privilege::Trigger => "TRIGGER",
            Privilege::Update => "UPDATE",
        }
    }

    /// Whether this privilege survives a quota violation.
    #[must_use]
    pub fn retained_on_violation(&self) -> bool {
        !WRITE_ACCESS.contains(self)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Privilege {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        FULL_ACCESS
            .iter()
            .copied()
            .find(|p| p.as_sql().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| format!("Unknown schema privilege: {s}"))
    }
}

/// Render a privilege list for a GRANT/REVOKE statement.
#[must_use]
pub fn sql_list(privileges: &[Privilege]) -> String {
    privileges
        .iter()
        .map(Privilege::as_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The full privilege set as an ordered set.
#[must_use]
pub fn full_access() -> BTreeSet<Privilege> {
    FULL_ACCESS.into_iter().collect()
}

/// What a violator keeps after its write privileges are revoked.
#[must_use]
pub fn retained_on_violation() -> BTreeSet<Privilege> {
    FULL_ACCESS
        .into_iter()
        .filter(Privilege::retained_on_violation)
        .collect()
}
