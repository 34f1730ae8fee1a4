//! Plain-text rendering of API payloads.

use shelfscan_domain::{
    CatalogItem, DetectionSummary, ImageResult, IrTask, ResultState, ResultStatusCounts,
    UploadRejection,
};

/// One catalog listing line.
pub fn catalog_line(item: &CatalogItem) -> String {
    let marker = if item.is_incomplete() { "  [INCOMPLETE]" } else { "" };
    format!("{}  {} ({}){marker}", item.uuid, item.name, item.subtitle())
}

/// One task listing line.
pub fn task_line(task: &IrTask) -> String {
    let features = task.features();
    let features = if features.is_empty() {
        "none".to_string()
    } else {
        features.join(", ")
    };
    format!(
        "{}  {}  features: {features}  created {}",
        task.uuid, task.name, task.created_at
    )
}

/// One result listing line.
pub fn result_line(result: &ImageResult) -> String {
    let detail = match &result.state {
        ResultState::Failed { failure_reason, .. } => failure_reason.clone(),
        _ => DetectionSummary::of(result).map_or_else(String::new, |summary| {
            format!(
                "{} gaps, {} items, {} shares",
                summary.gaps, summary.items, summary.shares
            )
        }),
    };
    format!(
        "{}  {:<10}  {:>6}  {:>6}  {detail}",
        result.uuid,
        result.state.label(),
        result.duration_label(),
        result.confidence_label()
    )
    .trim_end()
    .to_string()
}

/// Status counts line, or a placeholder when nothing was loaded.
pub fn counts_line(counts: &ResultStatusCounts) -> String {
    if counts.total() == 0 {
        "No results".to_string()
    } else {
        counts.to_string()
    }
}

/// Line explaining why a file was not uploaded.
pub fn rejection_line(rejection: &UploadRejection) -> String {
    format!("skipped {rejection}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use shelfscan_domain::schema::validate;
    use shelfscan_domain::{RejectionReason, ResultStatusCounts};

    fn result_json(status: &str) -> Value {
        json!({
            "uuid": "123e4567-e89b-12d3-a456-426614174000",
            "task_uuid": "123e4567-e89b-12d3-a456-426614174001",
            "image_url": "https://example.com/image.jpg",
            "status": status,
            "failure_reason": null,
            "duration": null,
            "confidence_score": null,
            "created_at": "2025-01-13T12:00:00Z",
            "updated_at": "2025-01-13T12:00:00Z",
            "postprocessing_results": { "realogram": null, "shares": [] }
        })
    }

    #[test]
    fn test_catalog_line_marks_incomplete() {
        let item: CatalogItem = validate(json!({
            "uuid": "123e4567-e89b-12d3-a456-426614174000",
            "status": "INCOMPLETE",
            "thumbnail_url": "https://example.com/thumb.jpg",
            "name": "Cola Zero",
            "barcode": "5000112637922",
            "custom_id": null,
            "height": null,
            "width": null,
            "depth": null,
            "brand": "Cola Co",
            "size": "330ml",
            "container_type": "can",
            "flavour": null,
            "packaging_size": null,
            "custom_props": [],
            "created_at": "2025-01-10T09:00:00Z",
            "updated_at": "2025-01-10T09:00:00Z"
        }))
        .unwrap();

        assert_eq!(
            catalog_line(&item),
            "123e4567-e89b-12d3-a456-426614174000  Cola Zero (Cola Co - 330ml)  [INCOMPLETE]"
        );
    }

    #[test]
    fn test_completed_result_line() {
        let mut value = result_json("COMPLETED");
        value["duration"] = json!(2500);
        value["confidence_score"] = json!(0.95);
        value["postprocessing_results"]["realogram"] = json!({
            "gaps": [{ "shelf_id": 1, "slot": 2, "stack_index": 0, "bbox": [0, 0, 10, 10] }],
            "item_entries": []
        });
        let result: ImageResult = validate(value).unwrap();

        assert_eq!(
            result_line(&result),
            "123e4567-e89b-12d3-a456-426614174000  Completed     2.5s   95.0%  1 gaps, 0 items, 0 shares"
        );
    }

    #[test]
    fn test_failed_result_line_shows_reason() {
        let mut value = result_json("FAILED");
        value["failure_reason"] = json!("Image too blurry");
        value["confidence_score"] = json!(0.0);
        let result: ImageResult = validate(value).unwrap();

        assert!(result_line(&result).ends_with("N/A     N/A  Image too blurry"));
    }

    #[test]
    fn test_counts_line() {
        assert_eq!(counts_line(&ResultStatusCounts::default()), "No results");
        let counts = ResultStatusCounts {
            in_progress: 1,
            completed: 2,
            ..ResultStatusCounts::default()
        };
        assert_eq!(counts_line(&counts), "1 processing • 2 completed");
    }

    #[test]
    fn test_rejection_line() {
        let rejection = UploadRejection {
            file_name: "blank.png".to_string(),
            reason: RejectionReason::Empty,
        };
        assert_eq!(rejection_line(&rejection), "skipped blank.png: File is empty");
    }
}
