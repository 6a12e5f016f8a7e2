use super::*;
use serde_json::json;

#[test]
fn kind_bytes_round_trip() {
    for kind in [
        MessageKind::ScreenshotRequest,
        MessageKind::PerformanceRequest,
        MessageKind::ImageBatchRequest,
        MessageKind::Response,
        MessageKind::ErrorResponse,
    ] {
        assert_eq!(MessageKind::from_byte(kind.as_byte()), Some(kind));
    }
}

#[test]
fn kind_bytes_match_protocol() {
    assert_eq!(MessageKind::ScreenshotRequest.as_byte(), 1);
    assert_eq!(MessageKind::PerformanceRequest.as_byte(), 2);
    assert_eq!(MessageKind::ImageBatchRequest.as_byte(), 3);
    assert_eq!(MessageKind::Response.as_byte(), 100);
    assert_eq!(MessageKind::ErrorResponse.as_byte(), 255);
}

#[test]
fn unknown_kind_byte_is_rejected() {
    assert_eq!(MessageKind::from_byte(0), None);
    assert_eq!(MessageKind::from_byte(4), None);
    assert_eq!(MessageKind::from_byte(99), None);
    assert_eq!(MessageKind::from_byte(254), None);
}

#[test]
fn request_kinds() {
    assert!(MessageKind::ScreenshotRequest.is_request());
    assert!(MessageKind::PerformanceRequest.is_request());
    assert!(MessageKind::ImageBatchRequest.is_request());
    assert!(!MessageKind::Response.is_request());
    assert!(!MessageKind::ErrorResponse.is_request());
}

#[test]
fn screenshot_request_payload() {
    let msg = Message::screenshot_request("https://example.com", Some("abc"));
    assert_eq!(msg.kind, MessageKind::ScreenshotRequest);
    assert_eq!(msg.url(), Some("https://example.com"));
    assert_eq!(msg.task_id(), Some("abc"));
}

#[test]
fn request_without_task_id() {
    let msg = Message::performance_request("https://example.com", None);
    assert_eq!(msg.task_id(), None);
}

#[test]
fn image_batch_request_carries_images() {
    let images = vec![
        "https://example.com/a.png".to_string(),
        "https://example.com/b.jpg".to_string(),
    ];
    let msg = Message::image_batch_request("https://example.com", &images, None);
    assert_eq!(msg.kind, MessageKind::ImageBatchRequest);
    assert_eq!(msg.images(), images);
}

#[test]
fn images_default_to_empty() {
    let msg = Message::screenshot_request("https://example.com", None);
    assert!(msg.images().is_empty());
}

#[test]
fn response_merges_task_id() {
    let msg = Message::response(json!({"performance": {"load_time_ms": 12.5}}), Some("t-9"));
    assert_eq!(msg.kind, MessageKind::Response);
    assert_eq!(msg.task_id(), Some("t-9"));
    assert_eq!(
        msg.field("performance"),
        Some(&json!({"load_time_ms": 12.5}))
    );
}

#[test]
fn response_wraps_non_object_data() {
    let msg = Message::response(json!(42), None);
    assert_eq!(msg.field("result"), Some(&json!(42)));
}

#[test]
fn error_response_payload() {
    let msg = Message::error_response("boom", Some("t-1"));
    assert_eq!(msg.kind, MessageKind::ErrorResponse);
    assert_eq!(msg.error(), Some("boom"));
    assert_eq!(msg.task_id(), Some("t-1"));
}
