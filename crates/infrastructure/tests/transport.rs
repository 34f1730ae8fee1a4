#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shelfscan_application::ShelfApi;
use shelfscan_domain::{ErrorKind, ImageUpload, PageRequest, ResultWindow};
use shelfscan_infrastructure::{ClientConfig, ReqwestTransport};
use uuid::Uuid;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn api_for(base_url: &str, timeout: Duration) -> ShelfApi {
    let config = ClientConfig {
        timeout,
        ..ClientConfig::new(base_url, API_KEY).unwrap()
    };
    ShelfApi::new(Arc::new(ReqwestTransport::new(&config).unwrap()))
}

fn api(server: &MockServer) -> ShelfApi {
    api_for(&server.uri(), Duration::from_secs(5))
}

fn task_json(name: &str) -> serde_json::Value {
    json!({
        "uuid": Uuid::new_v4(),
        "name": name,
        "created_at": "2025-01-10T09:00:00Z",
        "updated_at": "2025-01-10T09:00:00Z",
        "compute_realogram": true,
        "compute_shares": false
    })
}

#[tokio::test]
async fn sends_credentials_and_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/image-recognition/tasks"))
        .and(header("x-api-key", API_KEY))
        .and(header("content-type", "application/json"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [task_json("Aisle 4"), task_json("Aisle 5")],
            "total": 3,
            "limit": 2,
            "offset": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = api(&server)
        .fetch_task_page(PageRequest::first(2).unwrap())
        .await;

    let page = envelope.into_result().unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items[0].name, "Aisle 4");
    assert!(page.items[0].compute_realogram);
}

#[tokio::test]
async fn non_json_error_body_is_synthesized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/catalog-items"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>missing</html>"))
        .mount(&server)
        .await;

    let envelope = api(&server)
        .fetch_catalog_page(PageRequest::default())
        .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.error, "Unknown Error");
    assert_eq!(error.message, "HTTP 404: Not Found");
    assert_eq!(error.status_code, 404);
    assert_eq!(error.kind(), ErrorKind::Http);
}

#[tokio::test]
async fn server_error_body_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/catalog-items"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Invalid API key",
            "status_code": 401
        })))
        .mount(&server)
        .await;

    let envelope = api(&server)
        .fetch_catalog_page(PageRequest::default())
        .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.error, "Unauthorized");
    assert_eq!(error.message, "Invalid API key");
    assert_eq!(error.status_code, 401);
}

#[tokio::test]
async fn empty_object_is_a_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/catalog-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let envelope = api(&server)
        .fetch_catalog_page(PageRequest::default())
        .await;

    assert!(!envelope.is_success());
    let error = envelope.error().unwrap();
    assert_eq!(error.error, "Validation Error");
    assert_eq!(error.status_code, 0);
    assert!(!error.violations.is_empty());
}

#[tokio::test]
async fn results_carry_window_filters() {
    let server = MockServer::start().await;
    let task = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/v2/image-recognition/tasks/{task}/results")))
        .and(query_param("start_datetime", "2025-01-13T00:00:00Z"))
        .and(query_param("end_datetime", "2025-01-14T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "total": 0,
            "limit": 50,
            "offset": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let window = ResultWindow::between(
        Some("2025-01-13T00:00:00Z".parse().unwrap()),
        Some("2025-01-14T00:00:00Z".parse().unwrap()),
    )
    .unwrap();
    let envelope = api(&server)
        .fetch_task_results(task, PageRequest::default(), window)
        .await;

    assert!(envelope.is_success());
}

#[tokio::test]
async fn submit_sends_multipart_with_every_file() {
    let server = MockServer::start().await;
    let task = Uuid::new_v4();
    let created = vec![Uuid::new_v4(), Uuid::new_v4()];
    Mock::given(method("POST"))
        .and(path(format!("/v2/image-recognition/tasks/{task}/images")))
        .and(header("x-api-key", API_KEY))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(created)))
        .expect(1)
        .mount(&server)
        .await;

    let images = vec![
        ImageUpload::new("shelf1.jpg", "image/jpeg", vec![0xFF, 0xD8]).unwrap(),
        ImageUpload::new("shelf2.png", "image/png", vec![0x89, 0x50]).unwrap(),
    ];
    let envelope = api(&server)
        .submit_images(task, &images, Some("https://hooks.example.com/done"))
        .await;
    assert_eq!(envelope.into_result().unwrap(), created);

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let content_type = request.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8_lossy(&request.body);
    assert_eq!(body.matches("name=\"images\"").count(), 2);
    assert!(body.contains("filename=\"shelf1.jpg\""));
    assert!(body.contains("filename=\"shelf2.png\""));
    assert!(body.contains("name=\"callback\""));
    assert!(body.contains("https://hooks.example.com/done"));
}

#[tokio::test]
async fn slow_server_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/catalog-items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": [], "total": 0, "limit": 50, "offset": 0 }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let envelope = api_for(&server.uri(), Duration::from_millis(100))
        .fetch_catalog_page(PageRequest::default())
        .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.error, "Network Error");
    assert_eq!(error.status_code, 0);
    assert!(error.message.contains("timed out"));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let envelope = api_for(&format!("http://{address}"), Duration::from_secs(5))
        .fetch_task_page(PageRequest::default())
        .await;

    let error = envelope.error().unwrap();
    assert!(error.is_network());
    assert_eq!(error.error, "Network Error");
    assert_eq!(error.status_code, 0);
}
