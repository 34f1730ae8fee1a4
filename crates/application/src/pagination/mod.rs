//! "Load more" aggregation of paged collections.

mod aggregator;
mod source;

pub use aggregator::{AggregateSnapshot, LoadOutcome, PageAggregator};
pub use source::{PageSource, catalog_pages, result_pages, task_pages};
