//! Image-recognition tasks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{Fields, Schema, ValidationReport};

/// A configured image-recognition task images can be submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrTask {
    /// Task identifier.
    pub uuid: Uuid,
    /// Display name.
    pub name: String,
    /// Creation timestamp as sent by the server.
    pub created_at: String,
    /// Last update timestamp as sent by the server.
    pub updated_at: String,
    /// Whether results include a realogram (shelf layout).
    pub compute_realogram: bool,
    /// Whether results include shelf-share statistics.
    pub compute_shares: bool,
}

impl IrTask {
    /// Short labels of the enabled post-processing features.
    #[must_use]
    pub fn features(&self) -> Vec<&'static str> {
        let mut features = Vec::new();
        if self.compute_realogram {
            features.push("realogram");
        }
        if self.compute_shares {
            features.push("shares");
        }
        features
    }
}

impl Schema for IrTask {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.uuid("uuid");
        fields.string("name");
        fields.string("created_at");
        fields.string("updated_at");
        fields.boolean("compute_realogram");
        fields.boolean("compute_shares");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    fn task_json() -> Value {
        json!({
            "uuid": "0d6c8f4e-5b8a-4a57-9a4c-2f7f8f0e9b11",
            "name": "Cooler audit",
            "created_at": "2025-01-10T09:00:00Z",
            "updated_at": "2025-01-10T09:00:00Z",
            "compute_realogram": true,
            "compute_shares": false
        })
    }

    #[test]
    fn test_valid_task() {
        let task: IrTask = validate(task_json()).unwrap();
        assert_eq!(task.name, "Cooler audit");
        assert_eq!(task.features(), vec!["realogram"]);
    }

    #[test]
    fn test_flags_must_be_booleans() {
        let mut value = task_json();
        value["compute_shares"] = json!("yes");
        value.as_object_mut().unwrap().remove("compute_realogram");

        let report = validate::<IrTask>(value).unwrap_err();
        let paths: Vec<_> = report.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["$.compute_realogram", "$.compute_shares"]);
    }
}
