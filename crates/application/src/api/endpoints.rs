//! Endpoint paths, relative to the API base URL.

use uuid::Uuid;

/// Catalog listing.
pub const CATALOG_ITEMS: &str = "/v2/catalog-items";

/// Image-recognition task listing.
pub const IR_TASKS: &str = "/v2/image-recognition/tasks";

/// Image upload for one task.
#[must_use]
pub fn task_images(task: Uuid) -> String {
    format!("{IR_TASKS}/{task}/images")
}

/// Result listing for one task.
#[must_use]
pub fn task_results(task: Uuid) -> String {
    format!("{IR_TASKS}/{task}/results")
}

/// One result of one task.
#[must_use]
pub fn task_result(task: Uuid, result: Uuid) -> String {
    format!("{IR_TASKS}/{task}/results/{result}")
}
