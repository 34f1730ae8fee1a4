//! Image-recognition results and their query window.

mod image_result;
mod postprocessing;
mod summary;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DomainError, DomainResult};

pub use image_result::{
    ImageResult, ResultState, STATUS_COMPLETED, STATUS_FAILED, STATUS_IN_PROGRESS,
};
pub use postprocessing::{Gap, ItemEntry, PostprocessingResults, Realogram, Share, ShareValue};
pub use summary::{DetectionSummary, ResultStatusCounts};

/// Optional creation-time filter for result listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl ResultWindow {
    /// No filtering.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Results created within `[start, end]`; either bound may be open.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidWindow` if `end` precedes `start`.
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> DomainResult<Self> {
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            return Err(DomainError::InvalidWindow(format!(
                "end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Lower bound.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Upper bound.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Query parameters for the set bounds, RFC 3339 in UTC.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let format = |t: DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("start_datetime", format(start)));
        }
        if let Some(end) = self.end {
            pairs.push(("end_datetime", format(end)));
        }
        pairs
    }
}
