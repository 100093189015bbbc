//! Reconciliation plan
//!
//! Pure function from measured usage and current grant pairs to the
//! privilege changes one pass applies. No memory of earlier passes: every
//! schema lands in a bucket from its usage alone and every grantee on it
//! gets that bucket's target privilege set.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use schemabroker_backend::{BackendResult, Row};
use serde::Serialize;

use super::measure::SchemaUsage;

/// Where a schema stands against the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Usage at or above the limit.
    Violator,
    /// Usage below the limit.
    Compliant,
}

impl Bucket {
    #[must_use]
    pub fn classify(used_mb: Decimal, max_storage_mb: Decimal) -> Self {
        if used_mb >= max_storage_mb {
            Bucket::Violator
        } else {
            Bucket::Compliant
        }
    }
}

/// A grantee holding privileges on an instance schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GrantPair {
    pub grantee: String,
    pub schema: String,
}

/// Read `(GRANTEE, SCHEMA_NAME)` rows.
pub fn parse_pairs(rows: &[Row]) -> BackendResult<Vec<GrantPair>> {
    rows.iter()
        .map(|row| {
            Ok(GrantPair {
                grantee: row.text(0)?.to_string(),
                schema: row.text(1)?.to_string(),
            })
        })
        .collect()
}

/// What to do with one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Revoke the write privileges, keep SELECT, DELETE and DROP.
    RevokeWrite,
    /// Grant the full privilege set.
    GrantFull,
}

impl From<Bucket> for ChangeAction {
    fn from(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Violator => ChangeAction::RevokeWrite,
            Bucket::Compliant => ChangeAction::GrantFull,
        }
    }
}

/// One GRANT or REVOKE to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivilegeChange {
    pub grantee: String,
    pub schema: String,
    pub action: ChangeAction,
}

/// Outcome of partitioning one pass.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Usage per schema in MB. Schemas that hold grants but no tables read 0.
    pub usage: BTreeMap<String, Decimal>,
    pub violators: Vec<String>,
    pub compliant: Vec<String>,
    pub changes: Vec<PrivilegeChange>,
}

/// Partition schemas and derive the change for every grant pair.
#[must_use]
pub fn plan(usages: &[SchemaUsage], pairs: &[GrantPair], max_storage_mb: Decimal) -> Plan {
    let mut usage: BTreeMap<String, Decimal> = usages
        .iter()
        .map(|u| (u.schema.clone(), u.used_mb))
        .collect();
    for pair in pairs {
        usage.entry(pair.schema.clone()).or_insert(Decimal::ZERO);
    }

    let mut result = Plan::default();
    for (schema, used_mb) in &usage {
        match Bucket::classify(*used_mb, max_storage_mb) {
            Bucket::Violator => result.violators.push(schema.clone()),
            Bucket::Compliant => result.compliant.push(schema.clone()),
        }
    }

    let mut pairs: Vec<&GrantPair> = pairs.iter().collect();
    pairs.sort();
    pairs.dedup();

    result.changes = pairs
        .into_iter()
        .map(|pair| {
            let used_mb = usage.get(&pair.schema).copied().unwrap_or(Decimal::ZERO);
            PrivilegeChange {
                grantee: pair.grantee.clone(),
                schema: pair.schema.clone(),
                action: Bucket::classify(used_mb, max_storage_mb).into(),
            }
        })
        .collect();

    result.usage = usage;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(schema: &str, mb: i64) -> SchemaUsage {
        SchemaUsage {
            schema: schema.to_string(),
            used_mb: Decimal::from(mb),
        }
    }

    fn pair(grantee: &str, schema: &str) -> GrantPair {
        GrantPair {
            grantee: grantee.to_string(),
            schema: schema.to_string(),
        }
    }

    #[test]
    fn test_classify_boundary() {
        let limit = Decimal::from(100);
        assert_eq!(Bucket::classify(Decimal::from(100), limit), Bucket::Violator);
        assert_eq!(Bucket::classify(Decimal::new(9999, 2), limit), Bucket::Compliant);
        assert_eq!(Bucket::classify(Decimal::from(250), limit), Bucket::Violator);
    }

    #[test]
    fn test_plan_partitions_and_targets_every_pair() {
        let usages = [usage("CFS_A", 150), usage("CFS_B", 10)];
        let pairs = [
            pair("CFU_1", "CFS_A"),
            pair("CFU_2", "CFS_A"),
            pair("CFU_3", "CFS_B"),
        ];
        let plan = plan(&usages, &pairs, Decimal::from(100));

        assert_eq!(plan.violators, vec!["CFS_A"]);
        assert_eq!(plan.compliant, vec!["CFS_B"]);
        assert_eq!(plan.changes.len(), 3);
        assert!(plan
            .changes
            .iter()
            .filter(|c| c.schema == "CFS_A")
            .all(|c| c.action == ChangeAction::RevokeWrite));
        assert_eq!(plan.changes[2].action, ChangeAction::GrantFull);
    }

    #[test]
    fn test_schema_without_tables_is_compliant() {
        let plan = plan(&[], &[pair("CFU_1", "CFS_EMPTY")], Decimal::from(1));
        assert_eq!(plan.usage.get("CFS_EMPTY"), Some(&Decimal::ZERO));
        assert_eq!(plan.compliant, vec!["CFS_EMPTY"]);
        assert_eq!(plan.changes[0].action, ChangeAction::GrantFull);
    }

    #[test]
    fn test_zero_limit_makes_everything_a_violator() {
        let plan = plan(&[], &[pair("CFU_1", "CFS_A")], Decimal::ZERO);
        assert_eq!(plan.violators, vec!["CFS_A"]);
        assert_eq!(plan.changes[0].action, ChangeAction::RevokeWrite);
    }

    #[test]
    fn test_schemas_without_grantees_produce_no_changes() {
        let plan = plan(&[usage("CFS_A", 500)], &[], Decimal::from(100));
        assert_eq!(plan.violators, vec!["CFS_A"]);
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_duplicate_pairs_collapse() {
        let pairs = [pair("CFU_1", "CFS_A"), pair("CFU_1", "CFS_A")];
        let plan = plan(&[], &pairs, Decimal::from(100));
        assert_eq!(plan.changes.len(), 1);
    }
}
