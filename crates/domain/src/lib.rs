//! Shelfscan Domain - Core business types
//!
//! This crate defines the domain model for the Shelfscan API client:
//! catalog items, image-recognition tasks and results, pagination,
//! the response envelope, and the schemas every payload is validated
//! against. All types here are pure Rust with no I/O dependencies.

pub mod catalog;
pub mod envelope;
pub mod error;
pub mod page;
pub mod result;
pub mod schema;
pub mod task;
pub mod upload;

pub use catalog::{CatalogItem, CatalogItemStatus, CatalogSummary, CustomProp, CustomPropValue};
pub use envelope::{ApiEnvelope, ApiErrorDetail, ErrorKind};
pub use error::{DomainError, DomainResult};
pub use page::{CollectionKind, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest};
pub use result::{
    DetectionSummary, ImageResult, PostprocessingResults, ResultState, ResultStatusCounts,
    ResultWindow,
};
pub use schema::{FieldViolation, Schema, ValidationReport};
pub use task::IrTask;
pub use upload::{ImageBatch, ImageUpload, RejectionReason, UploadPolicy, UploadRejection};
