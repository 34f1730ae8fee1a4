//! HTTP transport port

use std::fmt;

use async_trait::async_trait;
use shelfscan_domain::ImageUpload;
use thiserror::Error;

/// HTTP methods used by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl HttpMethod {
    /// Returns the method as an uppercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// A file field.
    File {
        /// Field name.
        name: String,
        /// The file.
        upload: ImageUpload,
    },
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApiBody {
    /// No body.
    #[default]
    Empty,
    /// `multipart/form-data` body, parts in order.
    Multipart(Vec<FormPart>),
}

/// A request relative to the configured API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path below the base URL, starting with `/`.
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: ApiBody,
}

impl ApiRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: ApiBody::Empty,
        }
    }

    /// Creates a multipart POST request.
    #[must_use]
    pub fn post_multipart(path: impl Into<String>, parts: Vec<FormPart>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: ApiBody::Multipart(parts),
        }
    }

    /// Appends query parameters.
    #[must_use]
    pub fn with_query<K: Into<String>>(mut self, pairs: impl IntoIterator<Item = (K, String)>) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    /// Path plus the URL-encoded query string.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidRequest` if the query cannot be encoded.
    pub fn path_and_query(&self) -> Result<String, TransportError> {
        if self.query.is_empty() {
            return Ok(self.path.clone());
        }
        let query = serde_urlencoded::to_string(&self.query).map_err(|e| {
            TransportError::InvalidRequest(format!("query of {} cannot be encoded: {e}", self.path))
        })?;
        Ok(format!("{}?{query}", self.path))
    }

    /// Returns the value of the first query parameter named `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase, e.g. "Not Found". May be empty.
    pub status_text: String,
    /// Response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failures before any HTTP response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// DNS resolution failed.
    #[error("Could not resolve host: {host}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
    },

    /// The server refused the connection.
    #[error("Connection refused: {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// The connection failed for another reason.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for sending requests to the remote API.
///
/// Implementations attach the base URL, credentials and default headers.
/// A response with any status is `Ok`; `Err` means no response arrived.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when no HTTP response was received.
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}
