//! Realogram and shelf-share payloads attached to a result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Fields, Schema, ValidationReport};

/// Post-processing output of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessingResults {
    /// Detected shelf layout, when the task computes one.
    #[serde(default)]
    pub realogram: Option<Realogram>,
    /// Share statistics, one entry per image.
    pub shares: Vec<Share>,
}

impl PostprocessingResults {
    /// Total number of share values across all images.
    #[must_use]
    pub fn share_value_count(&self) -> usize {
        self.shares.iter().map(|share| share.values.len()).sum()
    }
}

impl Schema for PostprocessingResults {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.optional_nested::<Realogram>("realogram");
        fields.array::<Share>("shares");
    }
}

/// Detected shelf layout: empty slots and placed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Realogram {
    /// Empty slots.
    pub gaps: Vec<Gap>,
    /// Detected product placements.
    pub item_entries: Vec<ItemEntry>,
}

impl Schema for Realogram {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.array::<Gap>("gaps");
        fields.array::<ItemEntry>("item_entries");
    }
}

/// An empty slot on a shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// Shelf index.
    pub shelf_id: u32,
    /// Slot position on the shelf.
    pub slot: u32,
    /// Position in a vertical stack.
    pub stack_index: u32,
    /// Bounding box `[x1, y1, x2, y2]` in image pixels.
    pub bbox: [f64; 4],
}

impl Schema for Gap {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.unsigned("shelf_id");
        fields.unsigned("slot");
        fields.unsigned("stack_index");
        fields.require("bbox", "array of 4 numbers", |v| {
            v.as_array()
                .is_some_and(|coords| coords.len() == 4 && coords.iter().all(Value::is_number))
        });
    }
}

/// A detected product placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Detection annotation this entry refers to.
    pub annotation_id: u64,
    /// Shelf index.
    pub shelf_id: u32,
    /// Slot position on the shelf.
    pub slot: u32,
    /// Position in a vertical stack.
    pub stack_index: u32,
}

impl Schema for ItemEntry {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.unsigned("annotation_id");
        fields.unsigned("shelf_id");
        fields.unsigned("slot");
        fields.unsigned("stack_index");
    }
}

/// Share statistics of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Image the statistics refer to.
    pub image_id: u64,
    /// One value per product or tag.
    pub values: Vec<ShareValue>,
}

impl Schema for Share {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.unsigned("image_id");
        fields.array::<ShareValue>("values");
    }
}

/// Proportion of shelf space attributed to one product or one tag,
/// discriminated on `group_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "group_by", rename_all = "lowercase")]
pub enum ShareValue {
    /// Grouped by product.
    Products {
        /// Product the share belongs to.
        #[serde(default)]
        product_uuid: Option<String>,
        /// Number of facings.
        count: u64,
        /// Facings relative to all facings.
        count_ratio: f64,
        /// Occupied area in pixels.
        area: f64,
        /// Area relative to all detections.
        area_ratio: f64,
    },
    /// Grouped by tag.
    Tags {
        /// Tag the share belongs to.
        #[serde(default)]
        tag_uuid: Option<String>,
        /// Product, when the server resolves one.
        #[serde(default)]
        product_uuid: Option<String>,
        /// Number of facings.
        count: u64,
        /// Facings relative to all facings.
        count_ratio: f64,
        /// Occupied area in pixels.
        area: f64,
        /// Area relative to all detections.
        area_ratio: f64,
    },
}

impl ShareValue {
    /// Wire tags of `group_by`.
    pub const GROUPS: [&'static str; 2] = ["products", "tags"];

    /// Number of facings.
    #[must_use]
    pub const fn count(&self) -> u64 {
        match self {
            Self::Products { count, .. } | Self::Tags { count, .. } => *count,
        }
    }

    /// Area relative to all detections.
    #[must_use]
    pub const fn area_ratio(&self) -> f64 {
        match self {
            Self::Products { area_ratio, .. } | Self::Tags { area_ratio, .. } => *area_ratio,
        }
    }
}

impl Schema for ShareValue {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.literal("group_by", &Self::GROUPS);
        fields.unsigned("count");
        fields.number("count_ratio");
        fields.number("area");
        fields.number("area_ratio");
        fields.optional_string("product_uuid");
        if fields.get("group_by").and_then(Value::as_str) == Some("tags") {
            fields.optional_string("tag_uuid");
        }
    }
}
