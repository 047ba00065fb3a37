//! Row fingerprinting for incremental-load deduplication.
//!
//! The fingerprint is a SHA-256 digest over a canonical JSON rendering of
//! the row: keys sorted, temporal values in ISO-8601, decimals normalized.
//! Collisions gate dedup only, not access control, so the choice of digest
//! is about collision resistance for content identity, not security.
//!
//! Service columns (`source_row_id`, `row_hash`, …) are excluded from the
//! digest: two loads of the same business data must collide even when their
//! provenance counters differ.

use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::{
    cleaner::CleanedRow,
    columns::{ColumnClass, classify},
    value::Value,
};

fn canonical_json(value: &Value) -> JsonValue {
    match value {
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        // Decimals and temporals go through their canonical string form;
        // JSON number formatting is not stable enough to hash.
        other => JsonValue::String(other.canonical()),
    }
}

/// Computes the content fingerprint of a cleaned row.
///
/// Pure and deterministic: equal field values yield equal digests no matter
/// the in-memory insertion order (the row iterates sorted by column name).
pub fn fingerprint(row: &CleanedRow) -> String {
    let mut object = Map::new();
    for (column, value) in row.iter() {
        if classify(column) == ColumnClass::Service {
            continue;
        }
        let rendered = match value {
            Some(v) => canonical_json(v),
            None => JsonValue::Null,
        };
        object.insert(column.clone(), rendered);
    }
    let serialized =
        serde_json::to_string(&JsonValue::Object(object)).expect("canonical row serializes");

    let digest = Sha256::digest(serialized.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
