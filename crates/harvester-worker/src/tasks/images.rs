//! Image download and thumbnail generation.
//!
//! Downloads each image in a batch and produces a bounded PNG thumbnail,
//! returned base64-encoded. Individual failures (dead URL, non-image
//! content, undecodable bytes) are skipped so one bad image never costs
//! the rest of the batch.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::Cursor;
use std::time::Duration;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (Harvester Bot)";

/// Thumbnail bounding box, square.
const THUMBNAIL_SIZE: u32 = 150;

/// Downloads and thumbnails up to `max_images` of the given URLs.
pub fn process_batch(image_urls: &[String], max_images: usize) -> Vec<String> {
    image_urls
        .iter()
        .take(max_images)
        .filter_map(|url| {
            let bytes = download(url)?;
            thumbnail(&bytes).or_else(|| {
                tracing::warn!(%url, "image could not be decoded, skipping");
                None
            })
        })
        .collect()
}

/// Downloads one image, returning `None` unless the response is a
/// successful image-typed body.
fn download(url: &str) -> Option<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .ok()?;

    let response = match client.get(url).send() {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(%url, error = %e, "image download failed");
            return None;
        }
    };

    if !response.status().is_success() {
        return None;
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.contains("image") {
        return None;
    }

    response.bytes().ok().map(|b| b.to_vec())
}

/// Produces a base64-encoded PNG thumbnail bounded to
/// [`THUMBNAIL_SIZE`] on each side, preserving aspect ratio.
fn thumbnail(bytes: &[u8]) -> Option<String> {
    let image = image::load_from_memory(bytes).ok()?;
    let thumb = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);

    let mut out = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .ok()?;
    Some(BASE64.encode(out))
}
