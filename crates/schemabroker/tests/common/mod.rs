//! Integration test helpers for schemabroker.
//!
//! [`FakeCatalog`] stands in for the shared SQL server. It interprets the
//! statements the broker emits against an in-memory catalog of schemas,
//! users, grants and table sizes, answers with the server's error messages,
//! and keeps count of open sessions.
//!
//! # Usage
//!
//! ```ignore
//! let catalog = FakeCatalog::new();
//! let broker = test_broker(&catalog, QuotaPolicy::default());
//! broker.provision_instance("instance-1").await.unwrap();
//! assert!(catalog.has_schema("CFS_INSTANCE_1"));
//! assert_eq!(catalog.open_sessions(), 0);
//! ```

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use regex::Regex;
use schemabroker::{Broker, BrokerConfig, QuotaPolicy};
use schemabroker_backend::{
    async_trait, BackendConfig, BackendError, BackendResult, Row, SessionFactory, SqlSession,
    SqlValue,
};

/// Administrative account that owns every schema it creates.
pub const ADMIN: &str = "SYSTEM";

pub const MB: i64 = 1024 * 1024;

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    schemabroker::logging::init_test_logging();
}

#[derive(Default)]
struct CatalogState {
    schemas: BTreeSet<String>,
    users: BTreeMap<String, String>,
    /// (schema, grantee) -> privileges
    grants: BTreeMap<(String, String), BTreeSet<String>>,
    /// schema -> bytes used by its tables
    storage: BTreeMap<String, i64>,
    executed: Vec<String>,
    queries: Vec<String>,
    failures: Vec<(String, String)>,
    open_sessions: usize,
    sessions_opened: usize,
    refuse_sessions: bool,
}

/// In-memory stand-in for the shared SQL server.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        init_test_logging();
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap()
    }

    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(self.clone())
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.lock().schemas.contains(schema)
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.lock().users.contains_key(username)
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.lock().users.get(username).cloned()
    }

    pub fn privileges(&self, schema: &str, grantee: &str) -> BTreeSet<String> {
        self.lock()
            .grants
            .get(&(schema.to_string(), grantee.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Create a schema behind the broker's back.
    pub fn add_schema(&self, schema: &str) {
        let mut state = self.lock();
        state.schemas.insert(schema.to_string());
        grant_all_to_owner(&mut state, schema);
    }

    /// Create a user behind the broker's back.
    pub fn add_user(&self, username: &str) {
        self.lock()
            .users
            .insert(username.to_string(), "preexisting".to_string());
    }

    /// Grant privileges behind the broker's back.
    pub fn add_grant(&self, schema: &str, grantee: &str, privileges: &[&str]) {
        self.lock()
            .grants
            .entry((schema.to_string(), grantee.to_string()))
            .or_default()
            .extend(privileges.iter().map(|p| (*p).to_string()));
    }

    /// Set the bytes used by a schema's tables.
    pub fn set_storage(&self, schema: &str, bytes: i64) {
        self.lock().storage.insert(schema.to_string(), bytes);
    }

    /// Fail every statement containing `fragment` with `message`.
    pub fn fail_on(&self, fragment: &str, message: &str) {
        self.lock()
            .failures
            .push((fragment.to_string(), message.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Make `open()` fail.
    pub fn refuse_sessions(&self) {
        self.lock().refuse_sessions = true;
    }

    /// Every statement passed to `execute`, in order, including failed ones.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }
}

#[async_trait]
impl SessionFactory for FakeCatalog {
    async fn open(&self) -> BackendResult<Box<dyn SqlSession>> {
        let mut state = self.lock();
        if state.refuse_sessions {
            return Err(BackendError::new("connection refused"));
        }
        state.open_sessions += 1;
        state.sessions_opened += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<CatalogState>>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open_sessions -= 1;
        }
    }
}

#[async_trait]
impl SqlSession for FakeSession {
    async fn execute(&mut self, sql: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());
        injected_failure(&state, sql)?;
        apply(&mut state, sql)
    }

    async fn query(&mut self, sql: &str) -> BackendResult<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());
        injected_failure(&state, sql)?;
        answer(&state, sql)
    }
}

struct Patterns {
    create_schema: Regex,
    drop_schema: Regex,
    create_user: Regex,
    drop_user: Regex,
    grant: Regex,
    revoke: Regex,
    count_schema: Regex,
    count_schema_prefix: Regex,
    count_user: Regex,
    count_privilege: Regex,
    list_privileges: Regex,
    list_grantees: Regex,
    storage_prefix: Regex,
    storage_one: Regex,
}

const LIT: &str = r"'((?:[^']|'')*)'";
const IDENT: &str = r#""((?:[^"]|"")*)""#;

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: String| Regex::new(&p).unwrap();
        let like = format!(r"LIKE {LIT} ESCAPE '\\'");
        Patterns {
            create_schema: re(format!(r"^CREATE SCHEMA {IDENT}$")),
            drop_schema: re(format!(r"^DROP SCHEMA {IDENT} CASCADE$")),
            create_user: re(format!(
                r"^CREATE USER {IDENT} PASSWORD {IDENT} NO FORCE_FIRST_PASSWORD_CHANGE$"
            )),
            drop_user: re(format!(r"^DROP USER {IDENT} CASCADE$")),
            grant: re(format!(r"^GRANT (.+) ON SCHEMA {IDENT} TO {IDENT}$")),
            revoke: re(format!(r"^REVOKE (.+) ON SCHEMA {IDENT} FROM {IDENT}$")),
            count_schema: re(format!(
                r"^SELECT COUNT\(\*\) FROM SYS\.SCHEMAS WHERE SCHEMA_NAME = {LIT}$"
            )),
            count_schema_prefix: re(format!(
                r"^SELECT COUNT\(\*\) FROM SYS\.SCHEMAS WHERE SCHEMA_NAME {like}$"
            )),
            count_user: re(format!(
                r"^SELECT COUNT\(\*\) FROM SYS\.USERS WHERE USER_NAME = {LIT}$"
            )),
            count_privilege: re(format!(
                r"^SELECT COUNT\(\*\) FROM SYS\.GRANTED_PRIVILEGES WHERE SCHEMA_NAME = {LIT} AND GRANTEE = {LIT} AND PRIVILEGE = {LIT}$"
            )),
            list_privileges: re(format!(
                r"^SELECT DISTINCT PRIVILEGE FROM SYS\.GRANTED_PRIVILEGES WHERE SCHEMA_NAME = {LIT} AND GRANTEE = {LIT} ORDER BY PRIVILEGE$"
            )),
            list_grantees: re(format!(
                r"^SELECT DISTINCT GRANTEE, SCHEMA_NAME FROM SYS\.GRANTED_PRIVILEGES WHERE SCHEMA_NAME {like} AND GRANTEE {like} ORDER BY SCHEMA_NAME, GRANTEE$"
            )),
            storage_prefix: re(format!(
                r"^SELECT SCHEMA_NAME, SUM\(SIZE\) AS SIZE FROM \(.*SYS\.M_CS_TABLES.*SYS\.M_RS_TABLES.*\) WHERE SCHEMA_NAME {like} GROUP BY SCHEMA_NAME ORDER BY SCHEMA_NAME$"
            )),
            storage_one: re(format!(
                r"^SELECT SCHEMA_NAME, SUM\(SIZE\) AS SIZE FROM \(.*SYS\.M_CS_TABLES.*SYS\.M_RS_TABLES.*\) WHERE SCHEMA_NAME = {LIT} GROUP BY SCHEMA_NAME$"
            )),
        }
    })
}

fn unquote(raw: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    raw.replace(&doubled, &quote.to_string())
}

fn ident(caps: &regex::Captures<'_>, i: usize) -> String {
    unquote(&caps[i], '"')
}

fn literal(caps: &regex::Captures<'_>, i: usize) -> String {
    unquote(&caps[i], '\'')
}

/// Prefix of a `LIKE 'prefix%' ESCAPE '\'` pattern.
fn like_to_prefix(pattern: &str) -> String {
    let mut prefix = String::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    prefix.push(escaped);
                }
            }
            '%' => break,
            other => prefix.push(other),
        }
    }
    prefix
}

fn privilege_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|p| p.trim().to_string()).collect()
}

fn grant_all_to_owner(state: &mut CatalogState, schema: &str) {
    let all = [
        "ALTER", "CREATE ANY", "DEBUG", "DELETE", "DROP", "EXECUTE", "INDEX", "INSERT",
        "REFERENCES", "SELECT", "TRIGGER", "UPDATE",
    ];
    state
        .grants
        .entry((schema.to_string(), ADMIN.to_string()))
        .or_default()
        .extend(all.iter().map(|p| (*p).to_string()));
}

fn injected_failure(state: &CatalogState, sql: &str) -> BackendResult<()> {
    match state.failures.iter().find(|(fragment, _)| sql.contains(fragment.as_str())) {
        Some((_, message)) => Err(BackendError::new(message.clone())),
        None => Ok(()),
    }
}

fn apply(state: &mut CatalogState, sql: &str) -> BackendResult<()> {
    let p = patterns();

    if let Some(caps) = p.create_schema.captures(sql) {
        let schema = ident(&caps, 1);
        if !state.schemas.insert(schema.clone()) {
            return Err(BackendError::with_code(
                386,
                format!("cannot use duplicate schema name: {schema}"),
            ));
        }
        grant_all_to_owner(state, &schema);
        return Ok(());
    }

    if let Some(caps) = p.drop_schema.captures(sql) {
        let schema = ident(&caps, 1);
        if !state.schemas.remove(&schema) {
            return Err(BackendError::with_code(
                362,
                format!("invalid schema name: {schema}"),
            ));
        }
        state.grants.retain(|(s, _), _| *s != schema);
        state.storage.remove(&schema);
        return Ok(());
    }

    if let Some(caps) = p.create_user.captures(sql) {
        let username = ident(&caps, 1);
        if state.users.contains_key(&username) {
            return Err(BackendError::with_code(
                331,
                format!("user name already exists: {username}"),
            ));
        }
        state.users.insert(username, ident(&caps, 2));
        return Ok(());
    }

    if let Some(caps) = p.drop_user.captures(sql) {
        let username = ident(&caps, 1);
        if state.users.remove(&username).is_none() {
            return Err(BackendError::with_code(
                332,
                format!("invalid user name: {username}"),
            ));
        }
        state.grants.retain(|(_, g), _| *g != username);
        return Ok(());
    }

    if let Some(caps) = p.grant.captures(sql) {
        let (schema, grantee) = (ident(&caps, 2), ident(&caps, 3));
        check_grant_target(state, &schema, &grantee)?;
        state
            .grants
            .entry((schema, grantee))
            .or_default()
            .extend(privilege_list(&caps[1]));
        return Ok(());
    }

    if let Some(caps) = p.revoke.captures(sql) {
        let (schema, grantee) = (ident(&caps, 2), ident(&caps, 3));
        check_grant_target(state, &schema, &grantee)?;
        let key = (schema, grantee);
        if let Some(held) = state.grants.get_mut(&key) {
            for privilege in privilege_list(&caps[1]) {
                held.remove(&privilege);
            }
            if held.is_empty() {
                state.grants.remove(&key);
            }
        }
        return Ok(());
    }

    Err(BackendError::new(format!("unsupported statement: {sql}")))
}

fn check_grant_target(state: &CatalogState, schema: &str, grantee: &str) -> BackendResult<()> {
    if !state.schemas.contains(schema) {
        return Err(BackendError::with_code(
            362,
            format!("invalid schema name: {schema}"),
        ));
    }
    if grantee != ADMIN && !state.users.contains_key(grantee) {
        return Err(BackendError::with_code(
            332,
            format!("invalid user name: {grantee}"),
        ));
    }
    Ok(())
}

fn count(n: usize) -> Vec<Row> {
    vec![Row::new(vec![SqlValue::Integer(n as i64)])]
}

fn answer(state: &CatalogState, sql: &str) -> BackendResult<Vec<Row>> {
    let p = patterns();

    if let Some(caps) = p.count_schema.captures(sql) {
        let schema = literal(&caps, 1);
        return Ok(count(usize::from(state.schemas.contains(&schema))));
    }

    if let Some(caps) = p.count_schema_prefix.captures(sql) {
        let prefix = like_to_prefix(&literal(&caps, 1));
        return Ok(count(
            state.schemas.iter().filter(|s| s.starts_with(&prefix)).count(),
        ));
    }

    if let Some(caps) = p.count_user.captures(sql) {
        let username = literal(&caps, 1);
        return Ok(count(usize::from(state.users.contains_key(&username))));
    }

    if let Some(caps) = p.count_privilege.captures(sql) {
        let key = (literal(&caps, 1), literal(&caps, 2));
        let privilege = literal(&caps, 3);
        let held = state
            .grants
            .get(&key)
            .is_some_and(|set| set.contains(&privilege));
        return Ok(count(usize::from(held)));
    }

    if let Some(caps) = p.list_privileges.captures(sql) {
        let key = (literal(&caps, 1), literal(&caps, 2));
        return Ok(state
            .grants
            .get(&key)
            .map(|set| {
                set.iter()
                    .map(|p| Row::new(vec![SqlValue::from(p.as_str())]))
                    .collect()
            })
            .unwrap_or_default());
    }

    if let Some(caps) = p.list_grantees.captures(sql) {
        let schema_prefix = like_to_prefix(&literal(&caps, 1));
        let grantee_prefix = like_to_prefix(&literal(&caps, 2));
        return Ok(state
            .grants
            .iter()
            .filter(|((s, g), privileges)| {
                s.starts_with(&schema_prefix)
                    && g.starts_with(&grantee_prefix)
                    && !privileges.is_empty()
            })
            .map(|((s, g), _)| {
                Row::new(vec![SqlValue::from(g.as_str()), SqlValue::from(s.as_str())])
            })
            .collect());
    }

    if let Some(caps) = p.storage_prefix.captures(sql) {
        let prefix = like_to_prefix(&literal(&caps, 1));
        return Ok(state
            .storage
            .iter()
            .filter(|(s, _)| s.starts_with(&prefix) && state.schemas.contains(*s))
            .map(|(s, bytes)| Row::new(vec![SqlValue::from(s.as_str()), SqlValue::Integer(*bytes)]))
            .collect());
    }

    if let Some(caps) = p.storage_one.captures(sql) {
        let schema = literal(&caps, 1);
        return Ok(state
            .storage
            .get(&schema)
            .filter(|_| state.schemas.contains(&schema))
            .map(|bytes| vec![Row::new(vec![SqlValue::from(schema.as_str()), SqlValue::Integer(*bytes)])])
            .unwrap_or_default());
    }

    Err(BackendError::new(format!("unsupported query: {sql}")))
}

/// Backend connection parameters used by every test broker.
pub fn backend_config() -> BackendConfig {
    BackendConfig::new("hana.test.local", "HANA_TEST", ADMIN)
        .with_port(30015)
        .with_admin_password("admin-password")
}

/// Broker over the fake catalog.
pub fn test_broker(catalog: &FakeCatalog, quota: QuotaPolicy) -> Broker {
    let config = BrokerConfig::new(backend_config()).with_quota(quota);
    Broker::new(config, catalog.factory())
}

/// Quota policy with only a storage limit.
pub fn storage_limit(max_storage_mb: u64) -> QuotaPolicy {
    QuotaPolicy {
        max_storage_mb: Some(max_storage_mb),
        max_instances: None,
    }
}
