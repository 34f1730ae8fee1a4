//! The `{data, success, error}` envelope every API call resolves to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{FieldViolation, ValidationReport};

/// Error tag used when the request never completed.
pub const NETWORK_ERROR: &str = "Network Error";

/// Error tag used when a 2xx payload did not match its schema.
pub const VALIDATION_ERROR: &str = "Validation Error";

/// Error tag used when a non-2xx body could not be parsed.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Which stage of a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request never completed.
    Network,
    /// The server answered with a non-2xx status.
    #[default]
    Http,
    /// The server answered 2xx but the payload broke its contract.
    Validation,
}

/// Error half of an envelope.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{error}: {message}")]
pub struct ApiErrorDetail {
    /// Error tag, server-declared or one of the client tags.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP status, or 0 when no HTTP status applies.
    pub status_code: u16,
    /// Extra structured data supplied by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Field-level diff for validation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
    /// Failure classification.
    #[serde(default)]
    pub kind: ErrorKind,
}

/// Error body as the server sends it.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Map<String, Value>>,
}

fn status_line(status: u16, status_text: &str) -> String {
    format!("HTTP {status}: {status_text}")
}

impl ApiErrorDetail {
    /// The request could not reach the server.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            error: NETWORK_ERROR.to_string(),
            message: message.into(),
            status_code: 0,
            details: None,
            violations: Vec::new(),
            kind: ErrorKind::Network,
        }
    }

    /// The server answered 2xx with a payload that failed validation.
    #[must_use]
    pub fn validation(report: ValidationReport) -> Self {
        Self {
            error: VALIDATION_ERROR.to_string(),
            message: format!(
                "response did not match the expected schema ({} violation{}): {report}",
                report.len(),
                if report.len() == 1 { "" } else { "s" }
            ),
            status_code: 0,
            details: None,
            violations: report.into_violations(),
            kind: ErrorKind::Validation,
        }
    }

    /// Builds the error for a non-2xx response.
    ///
    /// The server's own error body is passed through when it carries an
    /// `error` tag; otherwise one is synthesized from the status line. A
    /// missing or empty `message` falls back to the status line. Either way
    /// `status_code` is the HTTP status.
    #[must_use]
    pub fn from_http_response(status: u16, status_text: &str, body: &[u8]) -> Self {
        match serde_json::from_slice::<ServerErrorBody>(body) {
            Ok(server) => Self {
                error: server.error,
                message: server
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| status_line(status, status_text)),
                status_code: status,
                details: server.details,
                violations: Vec::new(),
                kind: ErrorKind::Http,
            },
            Err(_) => Self::synthesized(status, status_text),
        }
    }

    /// Synthesized error carrying only the HTTP status line.
    #[must_use]
    pub fn synthesized(status: u16, status_text: &str) -> Self {
        Self {
            error: UNKNOWN_ERROR.to_string(),
            message: status_line(status, status_text),
            status_code: status,
            details: None,
            violations: Vec::new(),
            kind: ErrorKind::Http,
        }
    }

    /// Failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true for network failures.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self.kind, ErrorKind::Network)
    }

    /// Returns true for validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation)
    }
}

/// Outcome of one API call.
///
/// Either `success` with `data`, or failure with `error`; the fields are
/// private so no other combination can be built, and `data` is unreachable
/// on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiErrorDetail>,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope.
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            error: None,
        }
    }

    /// Failed envelope.
    pub const fn failure(error: ApiErrorDetail) -> Self {
        Self {
            data: None,
            success: false,
            error: Some(error),
        }
    }

    /// Returns true on success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Validated data, only on success.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Error detail, only on failure.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiErrorDetail> {
        self.error.as_ref()
    }

    /// Maps the data of a successful envelope.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiEnvelope<U> {
        ApiEnvelope {
            data: self.data.map(f),
            success: self.success,
            error: self.error,
        }
    }

    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the error detail of a failed envelope.
    pub fn into_result(self) -> Result<T, ApiErrorDetail> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiErrorDetail::network("envelope carried neither data nor error")),
        }
    }
}

impl<T> From<Result<T, ApiErrorDetail>> for ApiEnvelope<T> {
    fn from(result: Result<T, ApiErrorDetail>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::failure(error),
        }
    }
}
