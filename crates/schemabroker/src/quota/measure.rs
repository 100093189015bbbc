//! Storage measurement.

use rust_decimal::{Decimal, RoundingStrategy};
use schemabroker_backend::{BackendResult, Row};
use serde::Serialize;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Convert a byte count to MB with one decimal, midpoints away from zero.
#[must_use]
pub fn megabytes(bytes: Decimal) -> Decimal {
    (bytes / Decimal::from(BYTES_PER_MB))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Measured usage of one instance schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaUsage {
    pub schema: String,
    pub used_mb: Decimal,
}

/// Read `(SCHEMA_NAME, SIZE)` rows.
pub fn parse_usage(rows: &[Row]) -> BackendResult<Vec<SchemaUsage>> {
    rows.iter()
        .map(|row| {
            Ok(SchemaUsage {
                schema: row.text(0)?.to_string(),
                used_mb: megabytes(row.decimal(1)?),
            })
        })
        .collect()
}
