//! Protocol message types.
//!
//! A [`Message`] is the unit of communication between the orchestrator and
//! the worker service. It pairs a [`MessageKind`] tag with a JSON object
//! payload and is immutable once constructed: the sender builds it, the
//! receiver consumes it, nothing mutates it in flight.

use serde_json::{json, Map, Value};

/// The closed set of message kinds carried on the wire.
///
/// The discriminants are the exact kind bytes of the wire format. The set is
/// closed by design: every dispatch site matches it exhaustively, and an
/// unknown byte is rejected at decode time rather than mapped to a
/// catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Request a full-page screenshot of a URL
    ScreenshotRequest = 1,
    /// Request a page-performance analysis of a URL
    PerformanceRequest = 2,
    /// Request thumbnail generation for a batch of image URLs
    ImageBatchRequest = 3,
    /// Successful result for any request kind
    Response = 100,
    /// Failed result for any request kind
    ErrorResponse = 255,
}

impl MessageKind {
    /// Maps a wire kind byte to a message kind.
    ///
    /// Returns `None` for bytes outside the protocol, which the codec turns
    /// into a malformed-frame error.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(MessageKind::ScreenshotRequest),
            2 => Some(MessageKind::PerformanceRequest),
            3 => Some(MessageKind::ImageBatchRequest),
            100 => Some(MessageKind::Response),
            255 => Some(MessageKind::ErrorResponse),
            _ => None,
        }
    }

    /// The wire byte for this kind.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether this kind is one of the three task request kinds.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::ScreenshotRequest
                | MessageKind::PerformanceRequest
                | MessageKind::ImageBatchRequest
        )
    }
}

/// A protocol message: a kind tag plus a JSON object payload.
///
/// # Payload Shapes
///
/// - `ScreenshotRequest` / `PerformanceRequest`: `{url, task_id?}`
/// - `ImageBatchRequest`: `{url, images: [..], task_id?}`
/// - `Response`: result fields merged with `task_id` when present
/// - `ErrorResponse`: `{error, task_id?}`
///
/// # Example
///
/// ```
/// use harvester_common::protocol::{Message, MessageKind};
///
/// let request = Message::performance_request("https://example.com", Some("t-1"));
/// assert_eq!(request.kind, MessageKind::PerformanceRequest);
/// assert_eq!(request.url(), Some("https://example.com"));
/// assert_eq!(request.task_id(), Some("t-1"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The kind tag selecting how the payload is interpreted
    pub kind: MessageKind,
    /// JSON object payload
    pub payload: Value,
}

impl Message {
    /// Creates a message from a kind and a raw payload.
    pub fn new(kind: MessageKind, payload: Value) -> Self {
        Message { kind, payload }
    }

    /// Creates a screenshot request for a URL.
    pub fn screenshot_request(url: &str, task_id: Option<&str>) -> Self {
        Message::new(
            MessageKind::ScreenshotRequest,
            json!({ "url": url, "task_id": task_id }),
        )
    }

    /// Creates a performance-analysis request for a URL.
    pub fn performance_request(url: &str, task_id: Option<&str>) -> Self {
        Message::new(
            MessageKind::PerformanceRequest,
            json!({ "url": url, "task_id": task_id }),
        )
    }

    /// Creates an image-batch request for a page URL and its image URLs.
    pub fn image_batch_request(url: &str, images: &[String], task_id: Option<&str>) -> Self {
        Message::new(
            MessageKind::ImageBatchRequest,
            json!({ "url": url, "images": images, "task_id": task_id }),
        )
    }

    /// Creates a successful response.
    ///
    /// The result fields are merged with `task_id` when one is present, so
    /// the caller can correlate the reply with the request it sent.
    pub fn response(data: Value, task_id: Option<&str>) -> Self {
        let mut payload = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        if let Some(id) = task_id {
            payload.insert("task_id".to_string(), json!(id));
        }
        Message::new(MessageKind::Response, Value::Object(payload))
    }

    /// Creates an error response carrying a human-readable message.
    pub fn error_response(error: &str, task_id: Option<&str>) -> Self {
        Message::new(
            MessageKind::ErrorResponse,
            json!({ "error": error, "task_id": task_id }),
        )
    }

    /// The `url` payload field, if present and a string.
    pub fn url(&self) -> Option<&str> {
        self.payload.get("url").and_then(Value::as_str)
    }

    /// The `task_id` payload field, if present and a string.
    pub fn task_id(&self) -> Option<&str> {
        self.payload.get("task_id").and_then(Value::as_str)
    }

    /// The `images` payload field as a list of URLs.
    ///
    /// Missing field, non-array values, and non-string elements all
    /// collapse to an empty list.
    pub fn images(&self) -> Vec<String> {
        self.payload
            .get("images")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `error` payload field, if present and a string.
    pub fn error(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }

    /// Looks up an arbitrary payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
