//! Scrape pipeline: fetch, parse, fan out, join.

use crate::page;
use harvester_client::WorkerClient;
use harvester_common::protocol::{Message, MessageKind, Result};
use serde_json::{json, Value};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Harvester Bot)";

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Address of the worker service, e.g. "127.0.0.1:9000".
    pub worker_addr: String,
    /// Budget for each of the three sub-task calls.
    pub subcall_timeout: Duration,
    /// Maximum image URLs forwarded for thumbnail generation.
    pub max_images: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_addr: "127.0.0.1:9000".to_string(),
            subcall_timeout: Duration::from_secs(30),
            max_images: 5,
        }
    }
}

/// Drives a complete scrape of one URL.
///
/// The pipeline is:
///
/// 1. fetch the page HTML (async, 30s budget)
/// 2. parse title, links, structure, and meta tags locally
/// 3. fan out screenshot, performance, and image-batch calls to the
///    worker service in parallel, each on its own connection
/// 4. join the three results into the aggregate document
///
/// Step 3 is failure-tolerant: a sub-task that errors, times out, or
/// cannot reach the worker degrades to its placeholder value and the
/// scrape still succeeds. Only step 1 failures abort the request.
pub struct Orchestrator {
    client: WorkerClient,
    http: reqwest::Client,
    max_images: usize,
}

impl Orchestrator {
    /// Creates an orchestrator that sends sub-tasks to the worker at
    /// `config.worker_addr`.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                harvester_common::protocol::HarvestError::Connection(format!(
                    "http client setup failed: {}",
                    e
                ))
            })?;

        Ok(Self {
            client: WorkerClient::new(config.worker_addr, config.subcall_timeout),
            http,
            max_images: config.max_images,
        })
    }

    /// Scrapes `url` and returns the aggregate document.
    ///
    /// # Errors
    ///
    /// Fails only when the page itself cannot be fetched:
    /// [`HarvestError::InvalidRequest`], [`HarvestError::FetchTimeout`],
    /// or [`HarvestError::Fetch`]. Worker-side failures are absorbed into
    /// `processing_data` placeholders instead.
    ///
    /// [`HarvestError::InvalidRequest`]: harvester_common::protocol::HarvestError::InvalidRequest
    /// [`HarvestError::FetchTimeout`]: harvester_common::protocol::HarvestError::FetchTimeout
    /// [`HarvestError::Fetch`]: harvester_common::protocol::HarvestError::Fetch
    pub async fn scrape(&self, url: &str) -> Result<Value> {
        tracing::info!(url, "scrape started");
        let html = page::fetch_page(&self.http, url).await?;

        let scraping_data = page::parse_page(&html, url);
        let image_urls = page::extract_image_urls(&html, url, self.max_images);

        let processing_data = self.request_processing(url, &image_urls).await;

        tracing::info!(url, "scrape finished");
        Ok(json!({
            "url": url,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "scraping_data": scraping_data,
            "processing_data": processing_data,
            "status": "success",
        }))
    }

    /// Runs the three worker sub-tasks in parallel and joins them.
    ///
    /// Always returns the full `processing_data` shape; failed sub-tasks
    /// appear as their placeholders (`screenshot: null`,
    /// `performance: {"error": ...}`, `thumbnails: []`).
    pub async fn request_processing(&self, url: &str, image_urls: &[String]) -> Value {
        let (screenshot, performance, thumbnails) = tokio::join!(
            self.request_screenshot(url),
            self.request_performance(url),
            self.request_thumbnails(url, image_urls),
        );

        json!({
            "screenshot": screenshot,
            "performance": performance,
            "thumbnails": thumbnails,
        })
    }

    async fn request_screenshot(&self, url: &str) -> Value {
        let request = Message::screenshot_request(url, None);
        match self.client.call(&request).await {
            Ok(response) if response.kind == MessageKind::Response => response
                .field("screenshot")
                .cloned()
                .unwrap_or(Value::Null),
            Ok(response) => {
                tracing::warn!(url, error = ?response.error(), "screenshot task failed");
                Value::Null
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "screenshot call failed");
                Value::Null
            }
        }
    }

    async fn request_performance(&self, url: &str) -> Value {
        let request = Message::performance_request(url, None);
        match self.client.call(&request).await {
            Ok(response) if response.kind == MessageKind::Response => response
                .field("performance")
                .cloned()
                .unwrap_or_else(|| json!({})),
            Ok(response) => {
                tracing::warn!(url, error = ?response.error(), "performance task failed");
                json!({"error": response.error().unwrap_or("task failed")})
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "performance call failed");
                json!({"error": e.to_string()})
            }
        }
    }

    async fn request_thumbnails(&self, url: &str, image_urls: &[String]) -> Value {
        let request = Message::image_batch_request(url, image_urls, None);
        match self.client.call(&request).await {
            Ok(response) if response.kind == MessageKind::Response => response
                .field("thumbnails")
                .cloned()
                .unwrap_or_else(|| json!([])),
            Ok(response) => {
                tracing::warn!(url, error = ?response.error(), "image batch task failed");
                json!([])
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "image batch call failed");
                json!([])
            }
        }
    }
}
