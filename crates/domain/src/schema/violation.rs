//! Field-level validation diffs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on how much of an offending string is echoed back in a violation.
const MAX_ECHO_CHARS: usize = 40;

/// One place where a payload deviates from its declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// JSON path of the offending value, e.g. `$.items[3].status`.
    pub path: String,
    /// What the schema required at that path.
    pub expected: String,
    /// What the payload actually held.
    pub found: String,
}

impl FieldViolation {
    /// Creates a new violation.
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.path, self.expected, self.found
        )
    }
}

/// Accumulated violations for one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<FieldViolation>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Creates a report holding a single violation.
    pub fn single(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            violations: vec![FieldViolation::new(path, expected, found)],
        }
    }

    /// Records a violation.
    pub fn push(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    /// Returns true if no violation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of recorded violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Borrow the recorded violations.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Consume the report into its violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.as_slice() {
            [] => write!(f, "no violations"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

/// Short human-readable description of a JSON value (or its absence).
#[must_use]
pub fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => format!("boolean {b}"),
        Some(Value::Number(n)) => format!("number {n}"),
        Some(Value::String(s)) => describe_text(s),
        Some(Value::Array(items)) => format!("array of {} items", items.len()),
        Some(Value::Object(_)) => "object".to_string(),
    }
}

/// Describes a string value, truncating long ones.
#[must_use]
pub fn describe_text(s: &str) -> String {
    if s.chars().count() > MAX_ECHO_CHARS {
        let head: String = s.chars().take(MAX_ECHO_CHARS).collect();
        format!("string \"{head}...\"")
    } else {
        format!("string {s:?}")
    }
}
