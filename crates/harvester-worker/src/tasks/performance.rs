//! Page-performance analysis.
//!
//! Fetches the page with a blocking client, measures wall-clock load time
//! and transfer size, and counts the external resources referenced by the
//! HTML. Failures degrade to an `error` field inside the mapping rather
//! than a task error, so the orchestrator always receives a performance
//! object it can forward.

use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Harvester Bot)";

/// Analyzes the load performance of `url`.
pub fn analyze(url: &str) -> Value {
    let client = match reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(client) => client,
        Err(e) => return error_result(&format!("client setup failed: {}", e)),
    };

    let start = Instant::now();
    let response = match client.get(url).send() {
        Ok(response) => response,
        Err(e) if e.is_timeout() => return error_result("Timeout"),
        Err(e) => return error_result(&e.to_string()),
    };

    let status = response.status();
    let body = match response.bytes() {
        Ok(body) => body,
        Err(e) => return error_result(&e.to_string()),
    };
    let load_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut resources = json!({
        "images": 0,
        "scripts": 0,
        "stylesheets": 0,
        "other": 0,
    });
    let mut num_requests = 1u64; // the page itself

    if status.is_success() {
        let html = String::from_utf8_lossy(&body);
        resources = count_resources(&html);
        num_requests += resources
            .as_object()
            .map(|counts| counts.values().filter_map(Value::as_u64).sum::<u64>())
            .unwrap_or(0);
    }

    json!({
        "load_time_ms": (load_time_ms * 100.0).round() / 100.0,
        "total_size_kb": ((body.len() as f64 / 1024.0) * 100.0).round() / 100.0,
        "num_requests": num_requests,
        "resources": resources,
    })
}

/// Counts external resources referenced by the document.
fn count_resources(html: &str) -> Value {
    let document = Html::parse_document(html);

    // Selectors are statically valid; fall back to zero counts if not.
    let count = |selector: &str| -> u64 {
        Selector::parse(selector)
            .map(|sel| document.select(&sel).count() as u64)
            .unwrap_or(0)
    };

    json!({
        "images": count("img[src]"),
        "scripts": count("script[src]"),
        "stylesheets": count(r#"link[rel="stylesheet"]"#),
        "other": count("iframe[src], video[src], audio[src], embed[src]"),
    })
}

fn error_result(message: &str) -> Value {
    json!({
        "load_time_ms": 0,
        "total_size_kb": 0,
        "num_requests": 0,
        "resources": {"images": 0, "scripts": 0, "stylesheets": 0, "other": 0},
        "error": message,
    })
}
