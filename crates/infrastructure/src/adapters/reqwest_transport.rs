//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It owns the base URL,
//! the `X-API-Key` credential and the request timeout, so requests coming
//! from the application layer only carry a path, a query and a body.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use shelfscan_application::ports::{
    ApiBody, ApiRequest, HttpMethod, HttpTransport, RawResponse, TransportError,
};
use tracing::trace;

use crate::config::ClientConfig;
use crate::http::build_form;

/// Credential header sent with every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("Shelfscan/", env!("CARGO_PKG_VERSION"));

/// Transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport from client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|e| {
            TransportError::InvalidRequest(format!("API key is not a valid header value: {e}"))
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self::with_client(client, config.base_url.clone(), config.timeout))
    }

    /// Creates a transport around a preconfigured client.
    ///
    /// The client is expected to send the credential header itself.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of `request`. The base URL's own path is kept as a prefix.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let url = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.path_and_query()?
        );
        Url::parse(&url).map_err(|e| TransportError::InvalidRequest(format!("{e}: {url}")))
    }

    /// Converts the port's `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        if error.is_builder() {
            return TransportError::InvalidRequest(error.to_string());
        }

        if error.is_connect() {
            let message = describe(error);
            let lower = message.to_lowercase();
            let host = error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string();
            if lower.contains("dns") || lower.contains("resolve") {
                return TransportError::Dns { host };
            }
            if lower.contains("refused") {
                return TransportError::ConnectionRefused {
                    host,
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            if lower.contains("certificate") || lower.contains("tls") {
                return TransportError::Tls(message);
            }
            return TransportError::ConnectionFailed(message);
        }

        TransportError::Other(describe(error))
    }
}

/// The error and its sources, outermost first.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(&request)?;
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        trace!(method = %request.method, %url, "executing request");

        let builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url);
        let builder = match &request.body {
            ApiBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            ApiBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> ReqwestTransport {
        ReqwestTransport::new(&ClientConfig::new(base_url, "key").unwrap()).unwrap()
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Get), Method::GET);
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Post), Method::POST);
    }

    #[test]
    fn test_url_keeps_base_path() {
        let request = ApiRequest::get("/v2/catalog-items").with_query([("limit", "5".to_string())]);

        let url = transport("https://api.example.com").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/catalog-items?limit=5");

        let url = transport("https://example.com/api/").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/v2/catalog-items?limit=5");
    }

    #[test]
    fn test_invalid_api_key_header() {
        let config = ClientConfig::new("https://api.example.com", "bad\nkey").unwrap();
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TransportError::InvalidRequest(_))
        ));
    }
}
