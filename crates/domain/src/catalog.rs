//! Product catalog entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{Fields, Schema, ValidationReport};

/// Onboarding state of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogItemStatus {
    /// Missing data required for recognition.
    Incomplete,
    /// Ready for recognition.
    Onboarded,
}

impl CatalogItemStatus {
    /// Wire tags, in declaration order.
    pub const TAGS: [&'static str; 2] = ["INCOMPLETE", "ONBOARDED"];

    /// Wire tag of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "INCOMPLETE",
            Self::Onboarded => "ONBOARDED",
        }
    }
}

impl fmt::Display for CatalogItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a user-defined catalog property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomPropValue {
    /// Boolean flag.
    Flag(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
}

impl fmt::Display for CustomPropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// User-defined key/value property of a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProp {
    /// Property name.
    pub key: String,
    /// Property value; `None` when explicitly null.
    pub value: Option<CustomPropValue>,
}

impl Schema for CustomProp {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.string("key");
        fields.require("value", "string, number, boolean or null", |v| {
            !v.is_array() && !v.is_object()
        });
    }
}

/// One product of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Item identifier.
    pub uuid: Uuid,
    /// Onboarding state.
    pub status: CatalogItemStatus,
    /// Thumbnail location; may be empty.
    pub thumbnail_url: String,
    /// Display name.
    pub name: String,
    /// EAN/UPC barcode.
    pub barcode: Option<String>,
    /// Customer-side identifier.
    pub custom_id: Option<String>,
    /// Physical height.
    pub height: Option<f64>,
    /// Physical width.
    pub width: Option<f64>,
    /// Physical depth.
    pub depth: Option<f64>,
    /// Brand name.
    pub brand: Option<String>,
    /// Size label, e.g. "330ml".
    pub size: Option<String>,
    /// Container type, e.g. "can".
    pub container_type: Option<String>,
    /// Flavour label.
    pub flavour: Option<String>,
    /// Packaging size label.
    pub packaging_size: Option<String>,
    /// User-defined properties.
    pub custom_props: Vec<CustomProp>,
    /// Creation timestamp as sent by the server.
    pub created_at: String,
    /// Last update timestamp as sent by the server.
    pub updated_at: String,
}

impl CatalogItem {
    /// Returns true if the item still needs onboarding work.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self.status, CatalogItemStatus::Incomplete)
    }

    /// Secondary line for listings: "brand - size", either one alone,
    /// or the barcode as a last resort.
    #[must_use]
    pub fn subtitle(&self) -> String {
        let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        match (non_empty(&self.brand), non_empty(&self.size)) {
            (Some(brand), Some(size)) => format!("{brand} - {size}"),
            (Some(one), None) | (None, Some(one)) => one,
            (None, None) => format!(
                "Barcode: {}",
                non_empty(&self.barcode).unwrap_or_else(|| "N/A".to_string())
            ),
        }
    }

    /// Returns true if the item was modified after creation.
    #[must_use]
    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }
}

impl Schema for CatalogItem {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.uuid("uuid");
        fields.literal("status", &CatalogItemStatus::TAGS);
        fields.string("thumbnail_url");
        fields.string("name");
        for key in [
            "barcode",
            "custom_id",
            "brand",
            "size",
            "container_type",
            "flavour",
            "packaging_size",
        ] {
            fields.nullable_string(key);
        }
        for key in ["height", "width", "depth"] {
            fields.nullable_number(key);
        }
        fields.array::<CustomProp>("custom_props");
        fields.string("created_at");
        fields.string("updated_at");
    }
}

/// Counts of a loaded catalog slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Items loaded so far.
    pub loaded: usize,
    /// Loaded items still incomplete.
    pub incomplete: usize,
    /// Size of the whole catalog.
    pub total: u64,
}

impl CatalogSummary {
    /// Summarizes loaded items against the server-side total.
    #[must_use]
    pub fn of(items: &[CatalogItem], total: u64) -> Self {
        Self {
            loaded: items.len(),
            incomplete: items.iter().filter(|item| item.is_incomplete()).count(),
            total,
        }
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} of {} items ({} incomplete)",
            self.loaded, self.total, self.incomplete
        )
    }
}
