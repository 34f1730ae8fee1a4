//! Shared fixtures for this crate's tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use shelfscan_domain::ImageResult;
use shelfscan_domain::schema::validate;
use uuid::Uuid;

use crate::ports::{ApiRequest, HttpTransport, RawResponse, TransportError};

pub const TASK_ID: Uuid = Uuid::from_u128(0x0192_3e45_67e8_9b12_d3a4_5642_6614_1740);

/// Transport that replays queued outcomes and records every request.
///
/// The last queued outcome repeats once the queue runs down to it.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        let transport = Self::new();
        transport.push(Err(error));
        transport
    }

    pub fn respond(&self, status: u16, status_text: &str, body: Value) {
        self.respond_raw(status, status_text, body.to_string().into_bytes());
    }

    pub fn respond_raw(&self, status: u16, status_text: &str, body: Vec<u8>) {
        self.push(Ok(RawResponse::new(status, status_text, body)));
    }

    fn push(&self, outcome: Result<RawResponse, TransportError>) {
        self.outcomes.lock().expect("Lock poisoned").push_back(outcome);
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().expect("Lock poisoned").last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("Lock poisoned").len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().expect("Lock poisoned").push(request);
        let mut outcomes = self.outcomes.lock().expect("Lock poisoned");
        if outcomes.len() > 1 {
            outcomes.pop_front().expect("queue is not empty")
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Other("no response queued".to_string())))
        }
    }
}

/// A valid result payload for `status`.
pub fn result_json(status: &str) -> Value {
    let mut value = json!({
        "uuid": Uuid::new_v4(),
        "task_uuid": TASK_ID,
        "image_url": "https://example.com/image.jpg",
        "status": status,
        "failure_reason": null,
        "duration": null,
        "confidence_score": null,
        "created_at": "2025-01-13T12:00:00Z",
        "updated_at": "2025-01-13T12:00:00Z",
        "postprocessing_results": { "realogram": null, "shares": [] },
        "coco": null
    });
    match status {
        "IN_PROGRESS" => value["failure_reason"] = json!(""),
        "COMPLETED" => {
            value["duration"] = json!(1800);
            value["confidence_score"] = json!(0.91);
        }
        "FAILED" => {
            value["failure_reason"] = json!("Image too blurry");
            value["confidence_score"] = json!(0.0);
        }
        _ => {}
    }
    value
}

/// A validated result with `status`.
pub fn result(status: &str) -> ImageResult {
    validate(result_json(status)).unwrap()
}

/// A valid task payload named `name`.
pub fn task_json(name: &str) -> Value {
    json!({
        "uuid": Uuid::new_v4(),
        "name": name,
        "created_at": "2025-01-10T09:00:00Z",
        "updated_at": "2025-01-10T09:00:00Z",
        "compute_realogram": true,
        "compute_shares": false
    })
}

/// A page payload.
pub fn page_json(items: Vec<Value>, total: u64, limit: u32, offset: u64) -> Value {
    json!({ "items": items, "total": total, "limit": limit, "offset": offset })
}
