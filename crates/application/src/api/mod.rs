//! Schema-validated access to the remote API.
//!
//! Every operation returns an `ApiEnvelope`. Nothing here returns `Err` or
//! panics on a bad response: transport failures, non-2xx statuses and
//! payloads that do not match their schema all become failure envelopes,
//! and only a payload that passed validation is handed back as data.

pub mod endpoints;

use std::sync::Arc;

use shelfscan_domain::schema::validate_slice;
use shelfscan_domain::{
    ApiEnvelope, ApiErrorDetail, CatalogItem, ImageResult, ImageUpload, IrTask, Page, PageRequest,
    ResultWindow, Schema,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ports::{ApiRequest, FormPart, HttpTransport, RawResponse, TransportError};

/// Multipart field carrying each uploaded image.
pub const IMAGES_FIELD: &str = "images";

/// Multipart field carrying the optional completion callback URL.
pub const CALLBACK_FIELD: &str = "callback";

/// Client for the catalog and image-recognition endpoints.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct ShelfApi {
    transport: Arc<dyn HttpTransport>,
}

impl ShelfApi {
    /// Creates a client over the given transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetches one page of catalog items.
    pub async fn fetch_catalog_page(&self, page: PageRequest) -> ApiEnvelope<Page<CatalogItem>> {
        let request = ApiRequest::get(endpoints::CATALOG_ITEMS).with_query(page.query_pairs());
        self.send(request).await
    }

    /// Fetches one page of image-recognition tasks.
    pub async fn fetch_task_page(&self, page: PageRequest) -> ApiEnvelope<Page<IrTask>> {
        let request = ApiRequest::get(endpoints::IR_TASKS).with_query(page.query_pairs());
        self.send(request).await
    }

    /// Uploads images to a task in one multipart request.
    ///
    /// Every upload is sent as its own `images` part, in order. Returns the
    /// ids of the results the server created.
    pub async fn submit_images(
        &self,
        task: Uuid,
        images: &[ImageUpload],
        callback_url: Option<&str>,
    ) -> ApiEnvelope<Vec<Uuid>> {
        let mut parts: Vec<FormPart> = images
            .iter()
            .map(|upload| FormPart::File {
                name: IMAGES_FIELD.to_string(),
                upload: upload.clone(),
            })
            .collect();
        if let Some(callback) = callback_url {
            parts.push(FormPart::Text {
                name: CALLBACK_FIELD.to_string(),
                value: callback.to_string(),
            });
        }

        let request = ApiRequest::post_multipart(endpoints::task_images(task), parts);
        self.send(request).await
    }

    /// Fetches one page of a task's results, optionally filtered by creation time.
    pub async fn fetch_task_results(
        &self,
        task: Uuid,
        page: PageRequest,
        window: ResultWindow,
    ) -> ApiEnvelope<Page<ImageResult>> {
        let request = ApiRequest::get(endpoints::task_results(task))
            .with_query(page.query_pairs())
            .with_query(window.query_pairs());
        self.send(request).await
    }

    /// Fetches a single result.
    pub async fn fetch_single_result(&self, task: Uuid, result: Uuid) -> ApiEnvelope<ImageResult> {
        let request = ApiRequest::get(endpoints::task_result(task, result));
        self.send(request).await
    }

    async fn send<T: Schema>(&self, request: ApiRequest) -> ApiEnvelope<T> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, query = ?request.query, "sending request");

        let envelope = classify(self.transport.execute(request).await);
        if let Some(error) = envelope.error() {
            warn!(
                %method,
                %path,
                kind = %error.error,
                status = error.status_code,
                violations = error.violations.len(),
                "request failed: {}",
                error.message
            );
        }
        envelope
    }
}

impl std::fmt::Debug for ShelfApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelfApi").finish_non_exhaustive()
    }
}

/// Turns a transport outcome into an envelope.
///
/// No response is a network error, a non-2xx status is an HTTP error, and a
/// 2xx body must parse and validate as `T` to become data.
///
/// A request that could not be built never reached the server either, so
/// `TransportError::InvalidRequest` is also a network error; its message
/// starts with "Invalid request" to tell it apart.
pub fn classify<T: Schema>(outcome: Result<RawResponse, TransportError>) -> ApiEnvelope<T> {
    let response = match outcome {
        Ok(response) => response,
        Err(error) => return ApiEnvelope::failure(ApiErrorDetail::network(error.to_string())),
    };

    if !response.is_success() {
        return ApiEnvelope::failure(ApiErrorDetail::from_http_response(
            response.status,
            &response.status_text,
            &response.body,
        ));
    }

    match validate_slice::<T>(&response.body) {
        Ok(data) => ApiEnvelope::ok(data),
        Err(report) => ApiEnvelope::failure(ApiErrorDetail::validation(report)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::{ApiBody, HttpMethod};
    use crate::test_support::{MockTransport, TASK_ID, page_json, result_json};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shelfscan_domain::ErrorKind;

    fn api(transport: &Arc<MockTransport>) -> ShelfApi {
        ShelfApi::new(Arc::clone(transport) as Arc<dyn HttpTransport>)
    }

    #[tokio::test]
    async fn test_network_failure_becomes_network_error() {
        let transport = Arc::new(MockTransport::failing(TransportError::ConnectionRefused {
            host: "localhost".to_string(),
            port: 8080,
        }));
        let envelope = api(&transport)
            .fetch_task_page(PageRequest::default())
            .await;

        assert!(!envelope.is_success());
        assert!(envelope.data().is_none());
        let error = envelope.error().unwrap();
        assert_eq!(error.error, "Network Error");
        assert_eq!(error.status_code, 0);
        assert_eq!(error.kind(), ErrorKind::Network);
        assert_eq!(error.message, "Connection refused: localhost:8080");
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_a_network_error() {
        let transport = Arc::new(MockTransport::failing(TransportError::InvalidRequest(
            "invalid content type for a.png".to_string(),
        )));
        let envelope = api(&transport)
            .submit_images(TASK_ID, &[], None)
            .await;

        let error = envelope.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Network);
        assert_eq!(error.status_code, 0);
        assert_eq!(error.message, "Invalid request: invalid content type for a.png");
    }

    #[tokio::test]
    async fn test_server_error_body_is_passed_through() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            422,
            "Unprocessable Entity",
            json!({
                "error": "InvalidParameter",
                "message": "limit must be <= 100",
                "status_code": 422,
                "details": { "field": "limit" }
            }),
        );
        let envelope = api(&transport)
            .fetch_catalog_page(PageRequest::default())
            .await;

        let error = envelope.error().unwrap();
        assert_eq!(error.error, "InvalidParameter");
        assert_eq!(error.message, "limit must be <= 100");
        assert_eq!(error.status_code, 422);
        assert_eq!(error.kind(), ErrorKind::Http);
        assert!(error.details.is_some());
    }

    #[tokio::test]
    async fn test_unparsable_error_body_is_synthesized() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_raw(404, "Not Found", b"<html>nope</html>".to_vec());
        let envelope = api(&transport)
            .fetch_single_result(TASK_ID, Uuid::nil())
            .await;

        let error = envelope.error().unwrap();
        assert_eq!(error.error, "Unknown Error");
        assert_eq!(error.message, "HTTP 404: Not Found");
        assert_eq!(error.status_code, 404);
    }

    #[tokio::test]
    async fn test_empty_object_fails_validation() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", json!({}));
        let envelope = api(&transport)
            .fetch_catalog_page(PageRequest::default())
            .await;

        assert!(!envelope.is_success());
        let error = envelope.error().unwrap();
        assert_eq!(error.error, "Validation Error");
        assert_eq!(error.status_code, 0);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.violations.iter().any(|v| v.path == "$.items"));
    }

    #[tokio::test]
    async fn test_invalid_json_fails_validation() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_raw(200, "OK", b"not json".to_vec());
        let envelope = api(&transport).fetch_task_page(PageRequest::default()).await;

        let error = envelope.error().unwrap();
        assert!(error.is_validation());
        assert!(error.violations[0].found.starts_with("invalid JSON"));
    }

    #[tokio::test]
    async fn test_results_request_carries_window_and_page() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", page_json(vec![result_json("IN_PROGRESS")], 1, 20, 40));

        let start = "2025-01-13T00:00:00Z".parse().unwrap();
        let window = ResultWindow::between(Some(start), None).unwrap();
        let page = PageRequest::new(40, 20).unwrap();
        let envelope = api(&transport)
            .fetch_task_results(TASK_ID, page, window)
            .await;
        assert!(envelope.is_success());
        assert_eq!(envelope.data().unwrap().items.len(), 1);

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.path, format!("/v2/image-recognition/tasks/{TASK_ID}/results"));
        assert_eq!(request.query_value("offset"), Some("40"));
        assert_eq!(request.query_value("limit"), Some("20"));
        assert_eq!(request.query_value("start_datetime"), Some("2025-01-13T00:00:00Z"));
        assert_eq!(request.query_value("end_datetime"), None);
    }

    #[tokio::test]
    async fn test_submit_sends_every_file_and_callback() {
        let transport = Arc::new(MockTransport::new());
        let created = [Uuid::new_v4(), Uuid::new_v4()];
        transport.respond(200, "OK", json!(created));

        let images = vec![
            ImageUpload::new("shelf1.jpg", "image/jpeg", vec![1, 2, 3]).unwrap(),
            ImageUpload::new("shelf2.png", "image/png", vec![4, 5]).unwrap(),
        ];
        let envelope = api(&transport)
            .submit_images(TASK_ID, &images, Some("https://hooks.example.com/done"))
            .await;
        assert_eq!(envelope.data().unwrap(), &created.to_vec());

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, format!("/v2/image-recognition/tasks/{TASK_ID}/images"));
        let ApiBody::Multipart(parts) = request.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], FormPart::File { name, upload } if name == "images" && upload.file_name() == "shelf1.jpg"));
        assert!(matches!(&parts[1], FormPart::File { name, upload } if name == "images" && upload.file_name() == "shelf2.png"));
        assert!(matches!(&parts[2], FormPart::Text { name, value } if name == "callback" && value == "https://hooks.example.com/done"));
    }

    #[tokio::test]
    async fn test_submit_without_callback_has_no_text_part() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", json!([]));
        let images = vec![ImageUpload::new("a.png", "image/png", vec![1]).unwrap()];
        let _ = api(&transport).submit_images(TASK_ID, &images, None).await;

        let ApiBody::Multipart(parts) = transport.last_request().unwrap().body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 1);
    }

    #[tokio::test]
    async fn test_known_status_with_bad_fields_fails_the_page() {
        let transport = Arc::new(MockTransport::new());
        let mut broken = result_json("COMPLETED");
        broken["duration"] = json!(null);
        transport.respond(200, "OK", page_json(vec![result_json("FAILED"), broken], 2, 50, 0));

        let envelope = api(&transport)
            .fetch_task_results(TASK_ID, PageRequest::default(), ResultWindow::unbounded())
            .await;
        let error = envelope.error().unwrap();
        assert!(error.is_validation());
        assert_eq!(error.violations[0].path, "$.items[1].duration");
    }

    #[tokio::test]
    async fn test_unknown_status_does_not_fail_the_page() {
        let transport = Arc::new(MockTransport::new());
        let mut queued = result_json("QUEUED");
        queued["failure_reason"] = json!(null);
        transport.respond(200, "OK", page_json(vec![queued, result_json("COMPLETED")], 2, 50, 0));

        let envelope = api(&transport)
            .fetch_task_results(TASK_ID, PageRequest::default(), ResultWindow::unbounded())
            .await;
        let page = envelope.data().unwrap();
        assert_eq!(page.items[0].status(), "QUEUED");
        assert_eq!(page.items[1].status(), "COMPLETED");
    }
}
