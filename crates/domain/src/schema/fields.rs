//! Object-shape checks.

use serde_json::{Map, Value};
use uuid::Uuid;

use super::{FieldViolation, Schema, ValidationReport, describe, join_key};

/// Field-by-field checker for one JSON object.
///
/// Each method records a violation in the shared report when the field
/// does not have the required kind; none of them short-circuit.
///
/// ```
/// use serde_json::json;
/// use shelfscan_domain::schema::{Fields, ValidationReport};
///
/// let value = json!({ "name": "cola", "total": -1 });
/// let mut report = ValidationReport::new();
/// if let Some(mut fields) = Fields::of(&value, "$", &mut report) {
///     fields.string("name");
///     fields.unsigned("total");
/// }
/// assert_eq!(report.len(), 1);
/// assert_eq!(report.violations()[0].path, "$.total");
/// ```
pub struct Fields<'v, 'r> {
    map: &'v Map<String, Value>,
    path: &'v str,
    report: &'r mut ValidationReport,
}

impl<'v, 'r> Fields<'v, 'r> {
    /// Starts checking `value` as an object, or records a violation and
    /// returns `None` when it is not one.
    pub fn of(value: &'v Value, path: &'v str, report: &'r mut ValidationReport) -> Option<Self> {
        if let Some(map) = value.as_object() {
            Some(Self { map, path, report })
        } else {
            report.push(FieldViolation::new(path, "object", describe(Some(value))));
            None
        }
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'v Value> {
        self.map.get(key)
    }

    /// Records a violation for `key` unconditionally.
    pub fn violation(&mut self, key: &str, expected: impl Into<String>, found: impl Into<String>) {
        self.report
            .push(FieldViolation::new(join_key(self.path, key), expected, found));
    }

    /// Requires `key` to be present and satisfy `accepts`.
    pub fn require(&mut self, key: &str, expected: &str, accepts: impl Fn(&Value) -> bool) {
        let value = self.map.get(key);
        if !value.is_some_and(&accepts) {
            self.violation(key, expected, describe(value));
        }
    }

    /// Allows `key` to be missing or null; otherwise it must satisfy `accepts`.
    pub fn allow(&mut self, key: &str, expected: &str, accepts: impl Fn(&Value) -> bool) {
        match self.map.get(key) {
            None | Some(Value::Null) => {}
            Some(value) if accepts(value) => {}
            Some(value) => {
                let found = describe(Some(value));
                self.violation(key, format!("{expected} or null"), found);
            }
        }
    }

    /// Required string.
    pub fn string(&mut self, key: &str) {
        self.require(key, "string", Value::is_string);
    }

    /// Required key holding a string or null.
    pub fn nullable_string(&mut self, key: &str) {
        self.require(key, "string or null", |v| v.is_string() || v.is_null());
    }

    /// String, null, or absent.
    pub fn optional_string(&mut self, key: &str) {
        self.allow(key, "string", Value::is_string);
    }

    /// Required number.
    pub fn number(&mut self, key: &str) {
        self.require(key, "number", Value::is_number);
    }

    /// Required key holding a number or null.
    pub fn nullable_number(&mut self, key: &str) {
        self.require(key, "number or null", |v| v.is_number() || v.is_null());
    }

    /// Number, null, or absent.
    pub fn optional_number(&mut self, key: &str) {
        self.allow(key, "number", Value::is_number);
    }

    /// Required non-negative integer.
    pub fn unsigned(&mut self, key: &str) {
        self.require(key, "unsigned integer", Value::is_u64);
    }

    /// Required boolean.
    pub fn boolean(&mut self, key: &str) {
        self.require(key, "boolean", Value::is_boolean);
    }

    /// Required string equal to one of `allowed`.
    pub fn literal(&mut self, key: &str, allowed: &[&str]) {
        let expected = allowed
            .iter()
            .map(|tag| format!("{tag:?}"))
            .collect::<Vec<_>>()
            .join(" | ");
        self.require(key, &expected, |v| {
            v.as_str().is_some_and(|s| allowed.contains(&s))
        });
    }

    /// Required UUID string.
    pub fn uuid(&mut self, key: &str) {
        self.require(key, Uuid::EXPECTED, |v| {
            v.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok())
        });
    }

    /// Required nested value checked against `T`.
    pub fn nested<T: Schema>(&mut self, key: &str) {
        match self.map.get(key) {
            Some(value) => T::check(value, &join_key(self.path, key), self.report),
            None => self.violation(key, T::EXPECTED, "missing"),
        }
    }

    /// Nested value checked against `T`; null or absent is accepted.
    pub fn optional_nested<T: Schema>(&mut self, key: &str) {
        match self.map.get(key) {
            None | Some(Value::Null) => {}
            Some(value) => T::check(value, &join_key(self.path, key), self.report),
        }
    }

    /// Required array whose elements are checked against `T`.
    pub fn array<T: Schema>(&mut self, key: &str) {
        self.nested::<Vec<T>>(key);
    }
}
