//! Statement builders for the target dialect.
//!
//! All broker SQL is produced here. Schema and user names reaching these
//! builders have already been validated or derived by the identifier codec;
//! quoting below is a second line against injection, not the only one.
//!
//! Catalog views used:
//! - `SYS.SCHEMAS` for schema existence and prefix scans
//! - `SYS.USERS` for user existence
//! - `SYS.GRANTED_PRIVILEGES` for grant probes and grantee discovery
//! - `SYS.M_CS_TABLES` / `SYS.M_RS_TABLES` for column- and row-store sizes

use crate::privilege::{sql_list, Privilege};

/// Quote an identifier (`"NAME"`).
#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quote a string literal (`'value'`).
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `LIKE` predicate matching everything that starts with `prefix`.
///
/// `_` and `%` inside the prefix are escaped so `CFS_` does not match
/// `CFSX...`.
#[must_use]
pub fn like_prefix(column: &str, prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 4);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    format!("{column} LIKE {} ESCAPE '\\'", quote_literal(&pattern))
}

#[must_use]
pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA {}", quote_identifier(schema))
}

#[must_use]
pub fn drop_schema_cascade(schema: &str) -> String {
    format!("DROP SCHEMA {} CASCADE", quote_identifier(schema))
}

#[must_use]
pub fn count_schema(schema: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM SYS.SCHEMAS WHERE SCHEMA_NAME = {}",
        quote_literal(schema)
    )
}

#[must_use]
pub fn count_schemas_with_prefix(prefix: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM SYS.SCHEMAS WHERE {}",
        like_prefix("SCHEMA_NAME", prefix)
    )
}

/// `CREATE USER`. The password is quoted; generated passwords are
/// alphanumeric so no escaping is ever needed in practice.
#[must_use]
pub fn create_user(username: &str, password: &str) -> String {
    format!(
        "CREATE USER {} PASSWORD {} NO FORCE_FIRST_PASSWORD_CHANGE",
        quote_identifier(username),
        quote_identifier(password)
    )
}

#[must_use]
pub fn drop_user_cascade(username: &str) -> String {
    format!("DROP USER {} CASCADE", quote_identifier(username))
}

#[must_use]
pub fn count_user(username: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM SYS.USERS WHERE USER_NAME = {}",
        quote_literal(username)
    )
}

#[must_use]
pub fn grant_on_schema(privileges: &[Privilege], schema: &str, grantee: &str) -> String {
    format!(
        "GRANT {} ON SCHEMA {} TO {}",
        sql_list(privileges),
        quote_identifier(schema),
        quote_identifier(grantee)
    )
}

#[must_use]
pub fn revoke_on_schema(privileges: &[Privilege], schema: &str, grantee: &str) -> String {
    format!(
        "REVOKE {} ON SCHEMA {} FROM {}",
        sql_list(privileges),
        quote_identifier(schema),
        quote_identifier(grantee)
    )
}

/// Count grants of one privilege to one grantee on one schema.
#[must_use]
pub fn count_privilege(schema: &str, grantee: &str, privilege: Privilege) -> String {
    format!(
        "SELECT COUNT(*) FROM SYS.GRANTED_PRIVILEGES WHERE SCHEMA_NAME = {} AND GRANTEE = {} AND PRIVILEGE = {}",
        quote_literal(schema),
        quote_literal(grantee),
        quote_literal(privilege.as_sql())
    )
}

/// All privileges a grantee holds on a schema. Returns `(PRIVILEGE)` rows.
#[must_use]
pub fn list_privileges(schema: &str, grantee: &str) -> String {
    format!(
        "SELECT DISTINCT PRIVILEGE FROM SYS.GRANTED_PRIVILEGES WHERE SCHEMA_NAME = {} AND GRANTEE = {} ORDER BY PRIVILEGE",
        quote_literal(schema),
        quote_literal(grantee)
    )
}

/// Distinct `(GRANTEE, SCHEMA_NAME)` pairs on prefixed schemas, limited to
/// prefixed grantees.
#[must_use]
pub fn list_grantees(schema_prefix: &str, grantee_prefix: &str) -> String {
    format!(
        "SELECT DISTINCT GRANTEE, SCHEMA_NAME FROM SYS.GRANTED_PRIVILEGES WHERE {} AND {} ORDER BY SCHEMA_NAME, GRANTEE",
        like_prefix("SCHEMA_NAME", schema_prefix),
        like_prefix("GRANTEE", grantee_prefix)
    )
}

const STORAGE_BY_SCHEMA: &str = "SELECT SCHEMA_NAME, SUM(SIZE) AS SIZE FROM (\
SELECT SCHEMA_NAME, SUM(MEMORY_SIZE_IN_TOTAL) AS SIZE FROM SYS.M_CS_TABLES GROUP BY SCHEMA_NAME \
UNION ALL \
SELECT SCHEMA_NAME, SUM(USED_FIXED_PART_SIZE) + SUM(USED_VARIABLE_PART_SIZE) AS SIZE FROM SYS.M_RS_TABLES GROUP BY SCHEMA_NAME\
)";

/// Bytes used per prefixed schema across column and row store.
/// Returns `(SCHEMA_NAME, SIZE)` rows; schemas without tables are absent.
#[must_use]
pub fn storage_by_schema_prefix(prefix: &str) -> String {
    format!(
        "{STORAGE_BY_SCHEMA} WHERE {} GROUP BY SCHEMA_NAME ORDER BY SCHEMA_NAME",
        like_prefix("SCHEMA_NAME", prefix)
    )
}

/// Bytes used by a single schema. Returns zero or one `(SCHEMA_NAME, SIZE)` row.
#[must_use]
pub fn storage_of_schema(schema: &str) -> String {
    format!(
        "{STORAGE_BY_SCHEMA} WHERE SCHEMA_NAME = {} GROUP BY SCHEMA_NAME",
        quote_literal(schema)
    )
}
