//! Task family implementations.
//!
//! These are the CPU-heavy black boxes the pool executes: screenshot
//! capture, page-performance analysis, and image-batch thumbnailing. Each
//! absorbs its own transient failures (an unreachable page, a broken
//! image) and degrades its result instead of erroring; only a request that
//! is structurally unusable (no `url` field) comes back as a task error.

pub mod images;
pub mod performance;
pub mod screenshot;

use crate::pool::TaskKind;
use serde_json::{json, Value};

/// Maximum images processed per batch request.
pub const MAX_IMAGES: usize = 5;

/// Production task dispatcher wired into the worker pool.
///
/// The returned object carries the response payload for the matching
/// request kind: `{screenshot}`, `{performance}`, or `{thumbnails}`.
pub fn dispatch(kind: TaskKind, input: Value) -> Result<Value, String> {
    match kind {
        TaskKind::Screenshot => {
            let url = require_url(&input)?;
            tracing::info!(%url, "capturing screenshot");
            Ok(json!({ "screenshot": screenshot::capture(url) }))
        }
        TaskKind::Performance => {
            let url = require_url(&input)?;
            tracing::info!(%url, "analyzing performance");
            Ok(json!({ "performance": performance::analyze(url) }))
        }
        TaskKind::ImageBatch => {
            let images: Vec<String> = input
                .get("images")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            tracing::info!(count = images.len(), "processing image batch");
            Ok(json!({ "thumbnails": images::process_batch(&images, MAX_IMAGES) }))
        }
    }
}

fn require_url(input: &Value) -> Result<&str, String> {
    input
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| "request is missing the 'url' field".to_string())
}
