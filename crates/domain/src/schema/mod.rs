//! Response schemas.
//!
//! Every payload the remote API returns is checked against the shape its
//! Rust type declares before it is deserialized. Checking works on the raw
//! `serde_json::Value` so that *all* deviations are reported at once, each
//! with its JSON path, instead of stopping at serde's first error.

mod fields;
mod violation;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

pub use fields::Fields;
pub use violation::{FieldViolation, ValidationReport, describe, describe_text};

/// Path of the document root.
pub const ROOT: &str = "$";

/// A type whose JSON shape can be checked before deserialization.
pub trait Schema: DeserializeOwned {
    /// Short description of the JSON kind this type expects.
    const EXPECTED: &'static str = "object";

    /// Records every deviation of `value` (located at `path`) from this type's shape.
    fn check(value: &Value, path: &str, report: &mut ValidationReport);
}

/// Checks `value` against `T`'s schema and deserializes it when it conforms.
///
/// # Errors
///
/// Returns the full list of violations if the value does not conform.
pub fn validate<T: Schema>(value: Value) -> Result<T, ValidationReport> {
    let mut report = ValidationReport::new();
    T::check(&value, ROOT, &mut report);
    if !report.is_empty() {
        return Err(report);
    }

    serde_json::from_value(value)
        .map_err(|e| ValidationReport::single(ROOT, T::EXPECTED, e.to_string()))
}

/// Parses `bytes` as JSON and validates the document against `T`.
///
/// # Errors
///
/// Returns a single root violation for malformed JSON, or the schema
/// violations of a well-formed document.
pub fn validate_slice<T: Schema>(bytes: &[u8]) -> Result<T, ValidationReport> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ValidationReport::single(ROOT, "JSON document", format!("invalid JSON: {e}")))?;
    validate(value)
}

/// Joins a parent path and an object key.
#[must_use]
pub fn join_key(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

/// Joins a parent path and an array index.
#[must_use]
pub fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

impl<T: Schema> Schema for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(items) = value.as_array() else {
            report.push(FieldViolation::new(path, Self::EXPECTED, describe(Some(value))));
            return;
        };
        for (index, item) in items.iter().enumerate() {
            T::check(item, &join_index(path, index), report);
        }
    }
}

impl Schema for Uuid {
    const EXPECTED: &'static str = "UUID string";

    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let parses = value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok());
        if !parses {
            report.push(FieldViolation::new(path, Self::EXPECTED, describe(Some(value))));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_uuid_list() {
        let ids: Vec<Uuid> = validate(json!([
            "123e4567-e89b-12d3-a456-426614174000",
            "123e4567-e89b-12d3-a456-426614174001"
        ]))
        .expect("valid ids");
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_validate_uuid_list_reports_each_bad_entry() {
        let report = validate::<Vec<Uuid>>(json!(["nope", 7])).expect_err("invalid ids");
        let paths: Vec<_> = report.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["$[0]", "$[1]"]);
    }

    #[test]
    fn test_validate_slice_rejects_malformed_json() {
        let report = validate_slice::<Vec<Uuid>>(b"{not json").expect_err("malformed");
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations()[0].path, ROOT);
        assert!(report.violations()[0].found.starts_with("invalid JSON"));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_index(&join_key(ROOT, "items"), 3), "$.items[3]");
    }
}
