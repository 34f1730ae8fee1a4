//! Per-image processing results.
//!
//! The server tags every result with a `status` that constrains which of
//! `failure_reason`, `duration`, `confidence_score` and
//! `postprocessing_results` may be null:
//!
//! | status        | failure_reason | duration | confidence_score | postprocessing |
//! |---------------|----------------|----------|------------------|----------------|
//! | `IN_PROGRESS` | `""`           | null     | null             | present        |
//! | `FAILED`      | non-empty      | null     | number           | present        |
//! | `COMPLETED`   | null           | number   | number           | present        |
//!
//! Any other status string parses as [`ResultState::Unrecognized`] with
//! every dependent field nullable, so a status added by a newer API
//! version never fails a whole page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::postprocessing::PostprocessingResults;
use crate::schema::{Fields, FieldViolation, Schema, ValidationReport, describe_text, join_key};

/// Wire tag of an in-progress result.
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
/// Wire tag of a completed result.
pub const STATUS_COMPLETED: &str = "COMPLETED";
/// Wire tag of a failed result.
pub const STATUS_FAILED: &str = "FAILED";

/// Status-dependent part of a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    /// The image is still being processed.
    InProgress {
        /// Partial post-processing output.
        postprocessing_results: PostprocessingResults,
    },
    /// Processing finished.
    Completed {
        /// Processing time in milliseconds.
        duration: f64,
        /// Detection confidence in `0.0..=1.0`.
        confidence_score: f64,
        /// Realogram and shares.
        postprocessing_results: PostprocessingResults,
    },
    /// Processing failed.
    Failed {
        /// Why processing failed.
        failure_reason: String,
        /// Confidence reported alongside the failure.
        confidence_score: f64,
        /// Whatever post-processing output exists.
        postprocessing_results: PostprocessingResults,
    },
    /// A status this client does not know.
    Unrecognized {
        /// The status string as sent.
        status: String,
        /// Failure reason, if any.
        failure_reason: Option<String>,
        /// Duration, if any.
        duration: Option<f64>,
        /// Confidence, if any.
        confidence_score: Option<f64>,
        /// Post-processing output, if any.
        postprocessing_results: Option<PostprocessingResults>,
    },
}

impl ResultState {
    /// Wire status tag.
    #[must_use]
    pub fn status(&self) -> &str {
        match self {
            Self::InProgress { .. } => STATUS_IN_PROGRESS,
            Self::Completed { .. } => STATUS_COMPLETED,
            Self::Failed { .. } => STATUS_FAILED,
            Self::Unrecognized { status, .. } => status,
        }
    }

    /// Short label for listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InProgress { .. } => "Processing",
            Self::Completed { .. } => "Completed",
            Self::Failed { .. } => "Failed",
            Self::Unrecognized { .. } => "Unknown",
        }
    }
}

/// One processed (or processing) image of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImageResult", into = "RawImageResult")]
pub struct ImageResult {
    /// Result identifier.
    pub uuid: Uuid,
    /// Task the image was submitted to.
    pub task_uuid: Uuid,
    /// Location of the processed image.
    pub image_url: String,
    /// Creation timestamp as sent by the server.
    pub created_at: String,
    /// Last update timestamp as sent by the server.
    pub updated_at: String,
    /// Raw COCO annotations, passed through untouched.
    pub coco: Option<Value>,
    /// Status and the fields it governs.
    pub state: ResultState,
}

impl ImageResult {
    /// Wire status tag.
    #[must_use]
    pub fn status(&self) -> &str {
        self.state.status()
    }

    /// Returns true while the server is still processing the image.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(self.state, ResultState::InProgress { .. })
    }

    /// Processing time in milliseconds, when known.
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        match &self.state {
            ResultState::Completed { duration, .. } => Some(*duration),
            ResultState::Unrecognized { duration, .. } => *duration,
            ResultState::InProgress { .. } | ResultState::Failed { .. } => None,
        }
    }

    /// Failure reason, when the result failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            ResultState::Failed { failure_reason, .. } => Some(failure_reason),
            ResultState::Unrecognized { failure_reason, .. } => {
                failure_reason.as_deref().filter(|reason| !reason.is_empty())
            }
            ResultState::InProgress { .. } | ResultState::Completed { .. } => None,
        }
    }

    /// Post-processing output, when present.
    #[must_use]
    pub const fn postprocessing_results(&self) -> Option<&PostprocessingResults> {
        match &self.state {
            ResultState::InProgress {
                postprocessing_results,
            }
            | ResultState::Completed {
                postprocessing_results,
                ..
            }
            | ResultState::Failed {
                postprocessing_results,
                ..
            } => Some(postprocessing_results),
            ResultState::Unrecognized {
                postprocessing_results,
                ..
            } => postprocessing_results.as_ref(),
        }
    }

    /// Duration formatted in seconds, or `N/A` when unknown or non-positive.
    #[must_use]
    pub fn duration_label(&self) -> String {
        match self.duration() {
            Some(ms) if ms > 0.0 => format!("{:.1}s", ms / 1000.0),
            _ => "N/A".to_string(),
        }
    }

    /// Confidence as a percentage; only completed results show one.
    #[must_use]
    pub fn confidence_label(&self) -> String {
        match &self.state {
            ResultState::Completed {
                confidence_score, ..
            } => format!("{:.1}%", confidence_score * 100.0),
            _ => "N/A".to_string(),
        }
    }
}

impl Schema for ImageResult {
    fn check(value: &Value, path: &str, report: &mut ValidationReport) {
        let before = report.len();
        if let Some(mut fields) = Fields::of(value, path, report) {
            fields.uuid("uuid");
            fields.uuid("task_uuid");
            fields.string("image_url");
            fields.string("status");
            fields.string("created_at");
            fields.string("updated_at");
            fields.optional_string("failure_reason");
            fields.optional_number("duration");
            fields.optional_number("confidence_score");
            fields.optional_nested::<PostprocessingResults>("postprocessing_results");
        }
        if report.len() > before {
            return;
        }

        // Field kinds are right; now the status decides which may be null.
        match serde_json::from_value::<RawImageResult>(value.clone()) {
            Ok(raw) => {
                if let Err(mismatches) = raw.into_result() {
                    for mismatch in mismatches {
                        report.push(mismatch.at(path));
                    }
                }
            }
            Err(e) => report.push(FieldViolation::new(path, "image result", e.to_string())),
        }
    }
}

/// A dependent field that does not fit its status.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StateMismatch {
    field: &'static str,
    expected: String,
    found: String,
}

impl StateMismatch {
    fn at(self, path: &str) -> FieldViolation {
        FieldViolation::new(join_key(path, self.field), self.expected, self.found)
    }
}

/// Collects mismatches for one status while extracting the fields it needs.
struct StateRules {
    status: String,
    mismatches: Vec<StateMismatch>,
}

impl StateRules {
    const fn new(status: String) -> Self {
        Self {
            status,
            mismatches: Vec::new(),
        }
    }

    fn mismatch(&mut self, field: &'static str, expected: &str, found: String) {
        self.mismatches.push(StateMismatch {
            field,
            expected: format!("{expected} when status is {}", self.status),
            found,
        });
    }

    fn null_text(&mut self, field: &'static str, value: Option<&str>) {
        if let Some(text) = value {
            self.mismatch(field, "null", describe_text(text));
        }
    }

    fn empty_text(&mut self, field: &'static str, value: Option<&str>) {
        match value {
            Some("") => {}
            Some(text) => self.mismatch(field, "empty string", describe_text(text)),
            None => self.mismatch(field, "empty string", "null".to_string()),
        }
    }

    fn non_empty_text(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        match value {
            Some(text) if !text.is_empty() => Some(text),
            Some(_) => {
                self.mismatch(field, "non-empty string", "empty string".to_string());
                None
            }
            None => {
                self.mismatch(field, "non-empty string", "null".to_string());
                None
            }
        }
    }

    fn null_number(&mut self, field: &'static str, value: Option<f64>) {
        if let Some(n) = value {
            self.mismatch(field, "null", format!("number {n}"));
        }
    }

    fn number(&mut self, field: &'static str, value: Option<f64>) -> Option<f64> {
        if value.is_none() {
            self.mismatch(field, "number", "null".to_string());
        }
        value
    }

    fn present<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.mismatch(field, "object", "null".to_string());
        }
        value
    }

    fn finish(self, state: Option<ResultState>) -> Result<ResultState, Vec<StateMismatch>> {
        match state {
            Some(state) if self.mismatches.is_empty() => Ok(state),
            _ => Err(self.mismatches),
        }
    }
}

/// Flat wire form of [`ImageResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawImageResult {
    uuid: Uuid,
    task_uuid: Uuid,
    image_url: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    postprocessing_results: Option<PostprocessingResults>,
    created_at: String,
    updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coco: Option<Value>,
}

impl RawImageResult {
    fn into_state(
        status: String,
        failure_reason: Option<String>,
        duration: Option<f64>,
        confidence_score: Option<f64>,
        postprocessing_results: Option<PostprocessingResults>,
    ) -> Result<ResultState, Vec<StateMismatch>> {
        let known = [STATUS_IN_PROGRESS, STATUS_COMPLETED, STATUS_FAILED];
        if !known.contains(&status.as_str()) {
            return Ok(ResultState::Unrecognized {
                status,
                failure_reason,
                duration,
                confidence_score,
                postprocessing_results,
            });
        }

        let mut rules = StateRules::new(status.clone());
        let state = match status.as_str() {
            STATUS_IN_PROGRESS => {
                rules.empty_text("failure_reason", failure_reason.as_deref());
                rules.null_number("duration", duration);
                rules.null_number("confidence_score", confidence_score);
                rules
                    .present("postprocessing_results", postprocessing_results)
                    .map(|postprocessing_results| ResultState::InProgress {
                        postprocessing_results,
                    })
            }
            STATUS_FAILED => {
                let failure_reason = rules.non_empty_text("failure_reason", failure_reason);
                rules.null_number("duration", duration);
                let confidence_score = rules.number("confidence_score", confidence_score);
                let postprocessing_results =
                    rules.present("postprocessing_results", postprocessing_results);
                match (failure_reason, confidence_score, postprocessing_results) {
                    (Some(failure_reason), Some(confidence_score), Some(postprocessing_results)) => {
                        Some(ResultState::Failed {
                            failure_reason,
                            confidence_score,
                            postprocessing_results,
                        })
                    }
                    _ => None,
                }
            }
            _ => {
                rules.null_text("failure_reason", failure_reason.as_deref());
                let duration = rules.number("duration", duration);
                let confidence_score = rules.number("confidence_score", confidence_score);
                let postprocessing_results =
                    rules.present("postprocessing_results", postprocessing_results);
                match (duration, confidence_score, postprocessing_results) {
                    (Some(duration), Some(confidence_score), Some(postprocessing_results)) => {
                        Some(ResultState::Completed {
                            duration,
                            confidence_score,
                            postprocessing_results,
                        })
                    }
                    _ => None,
                }
            }
        };
        rules.finish(state)
    }

    fn into_result(self) -> Result<ImageResult, Vec<StateMismatch>> {
        let state = Self::into_state(
            self.status,
            self.failure_reason,
            self.duration,
            self.confidence_score,
            self.postprocessing_results,
        )?;
        Ok(ImageResult {
            uuid: self.uuid,
            task_uuid: self.task_uuid,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            coco: self.coco,
            state,
        })
    }
}

impl TryFrom<RawImageResult> for ImageResult {
    type Error = String;

    fn try_from(raw: RawImageResult) -> Result<Self, Self::Error> {
        raw.into_result().map_err(|mismatches| {
            mismatches
                .into_iter()
                .map(|m| format!("{}: expected {}, found {}", m.field, m.expected, m.found))
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

impl From<ImageResult> for RawImageResult {
    fn from(result: ImageResult) -> Self {
        let (status, failure_reason, duration, confidence_score, postprocessing_results) =
            match result.state {
                ResultState::InProgress {
                    postprocessing_results,
                } => (
                    STATUS_IN_PROGRESS.to_string(),
                    Some(String::new()),
                    None,
                    None,
                    Some(postprocessing_results),
                ),
                ResultState::Completed {
                    duration,
                    confidence_score,
                    postprocessing_results,
                } => (
                    STATUS_COMPLETED.to_string(),
                    None,
                    Some(duration),
                    Some(confidence_score),
                    Some(postprocessing_results),
                ),
                ResultState::Failed {
                    failure_reason,
                    confidence_score,
                    postprocessing_results,
                } => (
                    STATUS_FAILED.to_string(),
                    Some(failure_reason),
                    None,
                    Some(confidence_score),
                    Some(postprocessing_results),
                ),
                ResultState::Unrecognized {
                    status,
                    failure_reason,
                    duration,
                    confidence_score,
                    postprocessing_results,
                } => (
                    status,
                    failure_reason,
                    duration,
                    confidence_score,
                    postprocessing_results,
                ),
            };

        Self {
            uuid: result.uuid,
            task_uuid: result.task_uuid,
            image_url: result.image_url,
            status,
            failure_reason,
            duration,
            confidence_score,
            postprocessing_results,
            created_at: result.created_at,
            updated_at: result.updated_at,
            coco: result.coco,
        }
    }
}
