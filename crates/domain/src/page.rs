//! Offset/limit pagination types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::schema::{Fields, Schema, ValidationReport, join_key};

/// Largest page the remote API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page of a larger server-side collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    offset: u64,
    limit: u32,
}

impl PageRequest {
    /// Creates a page request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPageSize` unless `1 <= limit <= 100`.
    pub const fn new(offset: u64, limit: u32) -> DomainResult<Self> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidPageSize { limit });
        }
        Ok(Self { offset, limit })
    }

    /// Request for the first page of the given size.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPageSize` for an out-of-range size.
    pub const fn first(limit: u32) -> DomainResult<Self> {
        Self::new(0, limit)
    }

    /// Request for the page at `index` (zero-based) with this request's size.
    #[must_use]
    pub const fn at_page(&self, index: u64) -> Self {
        Self {
            offset: index * self.limit as u64,
            limit: self.limit,
        }
    }

    /// Offset of the first item.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of items.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Query parameters for this request, in wire order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of items as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// Size of the whole collection. Authoritative.
    pub total: u64,
    /// Page size the server applied.
    pub limit: u32,
    /// Offset of the first item.
    pub offset: u64,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, limit: u32, offset: u64) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }

    /// Offset one past the last item on this page.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.items.len() as u64
    }

    /// Returns true if the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Schema> Schema for Page<T> {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(mut fields) = Fields::of(value, path, report) else {
            return;
        };
        fields.array::<T>("items");
        fields.unsigned("total");
        fields.unsigned("offset");
        fields.require("limit", "integer between 1 and 100", |v| {
            v.as_u64().is_some_and(|n| (1..=u64::from(MAX_PAGE_SIZE)).contains(&n))
        });

        let item_count = fields.get("items").and_then(Value::as_array).map(Vec::len);
        let limit = fields.get("limit").and_then(Value::as_u64);
        if let (Some(count), Some(limit)) = (item_count, limit)
            && count as u64 > limit
        {
            report.push(crate::schema::FieldViolation::new(
                join_key(path, "items"),
                format!("at most {limit} items"),
                format!("{count} items"),
            ));
        }
    }
}

/// The logical collections this client pages through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Product catalog entries.
    CatalogItems,
    /// Image-recognition tasks.
    IrTasks,
    /// Processing results of one task.
    TaskResults(Uuid),
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatalogItems => write!(f, "catalog-items"),
            Self::IrTasks => write!(f, "ir-tasks"),
            Self::TaskResults(task) => write!(f, "task-results/{task}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(0, 1).is_ok());
        assert!(PageRequest::new(0, 100).is_ok());
        assert_eq!(
            PageRequest::new(0, 0),
            Err(DomainError::InvalidPageSize { limit: 0 })
        );
        assert_eq!(
            PageRequest::new(0, 101),
            Err(DomainError::InvalidPageSize { limit: 101 })
        );
    }

    #[test]
    fn test_nth_page_offset() {
        let request = PageRequest::first(25).unwrap().at_page(3);
        assert_eq!(request.offset(), 75);
        assert_eq!(
            request.query_pairs(),
            vec![("offset", "75".to_string()), ("limit", "25".to_string())]
        );
    }

    #[test]
    fn test_page_of_uuids_validates() {
        let page: Page<Uuid> = validate(json!({
            "items": ["123e4567-e89b-12d3-a456-426614174000"],
            "total": 9,
            "limit": 1,
            "offset": 4
        }))
        .unwrap();
        assert_eq!(page.total, 9);
        assert_eq!(page.end(), 5);
    }

    #[test]
    fn test_empty_object_reports_every_missing_field() {
        let report = validate::<Page<Uuid>>(json!({})).unwrap_err();
        let paths: Vec<_> = report.violations().iter().map(|v| v.path.clone()).collect();
        assert_eq!(paths, vec!["$.items", "$.total", "$.offset", "$.limit"]);
    }

    #[test]
    fn test_page_longer_than_limit_is_rejected() {
        let report = validate::<Page<Uuid>>(json!({
            "items": [
                "123e4567-e89b-12d3-a456-426614174000",
                "123e4567-e89b-12d3-a456-426614174001"
            ],
            "total": 2,
            "limit": 1,
            "offset": 0
        }))
        .unwrap_err();
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations()[0].expected, "at most 1 items");
    }

    #[test]
    fn test_collection_kind_display() {
        assert_eq!(CollectionKind::CatalogItems.to_string(), "catalog-items");
        assert_eq!(CollectionKind::IrTasks.to_string(), "ir-tasks");
    }
}
