//! Shelfscan Application - Ports and use cases
//!
//! This crate defines the application layer with:
//! - The transport port the infrastructure layer implements
//! - `ShelfApi`, which turns every transport outcome into an `ApiEnvelope`
//! - The page aggregator behind "load more" lists
//! - Background polling of results that are still processing

pub mod api;
pub mod error;
pub mod pagination;
pub mod polling;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::ShelfApi;
pub use error::{ApplicationError, ApplicationResult};
pub use pagination::{AggregateSnapshot, LoadOutcome, PageAggregator, PageSource};
pub use polling::{
    PollExit, PollHandle, Pending, RESULT_LIST_POLL_INTERVAL, ResultPoller,
    SINGLE_RESULT_POLL_INTERVAL, spawn_poll,
};
pub use ports::{ApiBody, ApiRequest, FormPart, HttpMethod, HttpTransport, RawResponse, TransportError};
