//! Derived counts over results.

use std::fmt;

use super::image_result::{ImageResult, ResultState};

/// Number of results in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultStatusCounts {
    /// Still processing.
    pub in_progress: usize,
    /// Finished successfully.
    pub completed: usize,
    /// Failed.
    pub failed: usize,
    /// Status unknown to this client.
    pub unrecognized: usize,
}

impl ResultStatusCounts {
    /// Counts the states of `results`.
    pub fn of<'a>(results: impl IntoIterator<Item = &'a ImageResult>) -> Self {
        results
            .into_iter()
            .fold(Self::default(), |mut counts, result| {
                match result.state {
                    ResultState::InProgress { .. } => counts.in_progress += 1,
                    ResultState::Completed { .. } => counts.completed += 1,
                    ResultState::Failed { .. } => counts.failed += 1,
                    ResultState::Unrecognized { .. } => counts.unrecognized += 1,
                }
                counts
            })
    }

    /// Total number of results counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.in_progress + self.completed + self.failed + self.unrecognized
    }

    /// Returns true if any result is still processing.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.in_progress > 0
    }
}

impl fmt::Display for ResultStatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.in_progress, "processing"),
            (self.completed, "completed"),
            (self.failed, "failed"),
            (self.unrecognized, "unknown"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();
        f.write_str(&parts.join(" • "))
    }
}

/// Detection figures of a completed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionSummary {
    /// Empty slots found.
    pub gaps: usize,
    /// Product placements found.
    pub items: usize,
    /// Share values across all images.
    pub shares: usize,
}

impl DetectionSummary {
    /// Summary of a completed result with a realogram; `None` otherwise.
    #[must_use]
    pub fn of(result: &ImageResult) -> Option<Self> {
        let ResultState::Completed {
            postprocessing_results,
            ..
        } = &result.state
        else {
            return None;
        };
        let realogram = postprocessing_results.realogram.as_ref()?;
        Some(Self {
            gaps: realogram.gaps.len(),
            items: realogram.item_entries.len(),
            shares: postprocessing_results.share_value_count(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::result::image_result::tests::result_json;
    use crate::result::image_result::{STATUS_COMPLETED, STATUS_FAILED, STATUS_IN_PROGRESS};
    use crate::schema::validate;
    use serde_json::json;

    #[test]
    fn test_counts_and_display() {
        let results: Vec<ImageResult> = [
            STATUS_IN_PROGRESS,
            STATUS_IN_PROGRESS,
            STATUS_COMPLETED,
            STATUS_FAILED,
        ]
        .into_iter()
        .map(|status| validate(result_json(status)).unwrap())
        .collect();

        let counts = ResultStatusCounts::of(&results);
        assert_eq!(counts.in_progress, 2);
        assert_eq!(counts.total(), 4);
        assert!(counts.has_pending());
        assert_eq!(counts.to_string(), "2 processing • 1 completed • 1 failed");
    }

    #[test]
    fn test_detection_summary_needs_completed_realogram() {
        let mut value = result_json(STATUS_COMPLETED);
        value["postprocessing_results"] = json!({
            "realogram": {
                "gaps": [
                    { "shelf_id": 1, "slot": 2, "stack_index": 0, "bbox": [0, 0, 100, 100] },
                    { "shelf_id": 1, "slot": 3, "stack_index": 0, "bbox": [100, 0, 200, 100] }
                ],
                "item_entries": [
                    { "annotation_id": 1, "shelf_id": 1, "slot": 1, "stack_index": 0 }
                ]
            },
            "shares": [{ "image_id": 1, "values": [{
                "group_by": "products", "product_uuid": "prod-1", "count": 5,
                "count_ratio": 0.5, "area": 1000, "area_ratio": 0.6
            }] }]
        });
        let completed: ImageResult = validate(value).unwrap();
        assert_eq!(
            DetectionSummary::of(&completed),
            Some(DetectionSummary {
                gaps: 2,
                items: 1,
                shares: 1
            })
        );

        let pending: ImageResult = validate(result_json(STATUS_IN_PROGRESS)).unwrap();
        assert_eq!(DetectionSummary::of(&pending), None);
    }
}
