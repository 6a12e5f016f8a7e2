//! Page fetching and HTML extraction.
//!
//! Fetching is async (shared `reqwest` client, 30s budget); extraction is
//! pure and synchronous, so callers parse between awaits and never hold a
//! DOM across one.

use harvester_common::protocol::{HarvestError, Result};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use url::Url;

/// Upper bound on links collected from a single page.
const MAX_LINKS: usize = 100;

/// Meta names lifted into the `meta_tags` mapping verbatim.
const BASIC_META_NAMES: &[&str] = &[
    "description",
    "keywords",
    "author",
    "viewport",
    "robots",
    "generator",
];

/// Fetches `url` and returns its HTML body.
///
/// # Errors
///
/// - [`HarvestError::InvalidRequest`] when `url` is not an http(s) URL
/// - [`HarvestError::FetchTimeout`] when the request exceeds the client's
///   timeout budget
/// - [`HarvestError::Fetch`] on connection errors, error statuses, and
///   non-HTML content types
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    validate_url(url)?;

    let response = client.get(url).send().await.map_err(map_fetch_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Fetch(format!(
            "{} returned status {}",
            url, status
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !content_type.contains("text/html") {
        return Err(HarvestError::Fetch(format!(
            "non-HTML content type: {}",
            content_type
        )));
    }

    response.text().await.map_err(map_fetch_error)
}

fn map_fetch_error(e: reqwest::Error) -> HarvestError {
    if e.is_timeout() {
        HarvestError::FetchTimeout(e.to_string())
    } else {
        HarvestError::Fetch(e.to_string())
    }
}

/// Rejects anything that is not an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| HarvestError::InvalidRequest(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(HarvestError::InvalidRequest(format!(
            "unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Extracts the page summary: title, outbound links, image count, header
/// structure, and meta tags.
pub fn parse_page(html: &str, base_url: &str) -> Value {
    let document = Html::parse_document(html);

    json!({
        "title": extract_title(&document),
        "links": extract_links(&document, base_url),
        "images_count": count_elements(&document, "img"),
        "structure": extract_structure(&document),
        "meta_tags": extract_meta_tags(&document),
    })
}

fn extract_title(document: &Html) -> String {
    for selector in ["title", "h1"] {
        if let Ok(sel) = Selector::parse(selector) {
            if let Some(element) = document.select(&sel).next() {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

/// Absolute, deduplicated http(s) links, capped at [`MAX_LINKS`].
fn extract_links(document: &Html, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }
        let absolute = absolute.to_string();
        if !links.contains(&absolute) {
            links.push(absolute);
            if links.len() >= MAX_LINKS {
                break;
            }
        }
    }
    links
}

fn count_elements(document: &Html, selector: &str) -> u64 {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).count() as u64)
        .unwrap_or(0)
}

/// Header counts, `h1` through `h6`.
fn extract_structure(document: &Html) -> Value {
    let mut structure = Map::new();
    for level in 1..=6 {
        let tag = format!("h{}", level);
        structure.insert(tag.clone(), json!(count_elements(document, &tag)));
    }
    Value::Object(structure)
}

/// Basic meta names, the charset declaration, Open Graph properties, and
/// Twitter Card names, flattened into one mapping.
fn extract_meta_tags(document: &Html) -> Value {
    let mut tags = Map::new();
    let Ok(sel) = Selector::parse("meta") else {
        return Value::Object(tags);
    };

    for element in document.select(&sel) {
        let meta = element.value();
        if let Some(charset) = meta.attr("charset") {
            tags.insert("charset".to_string(), json!(charset));
            continue;
        }

        let Some(content) = meta.attr("content") else {
            continue;
        };
        if let Some(name) = meta.attr("name") {
            if BASIC_META_NAMES.contains(&name) || name.starts_with("twitter:") {
                tags.insert(name.to_string(), json!(content));
            }
        } else if let Some(property) = meta.attr("property") {
            if property.starts_with("og:") {
                tags.insert(property.to_string(), json!(content));
            }
        }
    }
    Value::Object(tags)
}

/// Extracts up to `limit` absolute image URLs with a recognized raster
/// extension, resolved against `base_url`.
pub fn extract_image_urls(html: &str, base_url: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for element in document.select(&sel) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Ok(absolute) = base.join(src) else {
            continue;
        };
        if !matches!(absolute.scheme(), "http" | "https") || !has_image_extension(&absolute) {
            continue;
        }
        let absolute = absolute.to_string();
        if !images.contains(&absolute) {
            images.push(absolute);
            if images.len() >= limit {
                break;
            }
        }
    }
    images
}

fn has_image_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    ["jpg", "jpeg", "png", "gif", "webp"]
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head>
            <title> Example Domain </title>
            <meta charset="utf-8">
            <meta name="description" content="A page for examples">
            <meta name="twitter:card" content="summary">
            <meta property="og:title" content="Example">
            <meta name="tracking-pixel" content="ignored">
        </head>
        <body>
            <h1>Heading</h1>
            <h2>Sub one</h2>
            <h2>Sub two</h2>
            <a href="/about">About</a>
            <a href="https://other.example/page">Other</a>
            <a href="/about">Duplicate</a>
            <a href="mailto:someone@example.com">Mail</a>
            <img src="/logo.png">
            <img src="photo.jpg?size=large">
            <img src="diagram.svg">
        </body>
        </html>
    "#;

    #[test]
    fn parses_title_links_and_structure() {
        let page = parse_page(PAGE, "https://example.com/");
        assert_eq!(page["title"], "Example Domain");
        assert_eq!(page["images_count"], 3);
        assert_eq!(page["structure"]["h1"], 1);
        assert_eq!(page["structure"]["h2"], 2);
        assert_eq!(page["structure"]["h6"], 0);

        let links = page["links"].as_array().unwrap();
        assert_eq!(
            links,
            &[
                json!("https://example.com/about"),
                json!("https://other.example/page"),
            ]
        );
    }

    #[test]
    fn falls_back_to_h1_when_title_is_missing() {
        let page = parse_page("<body><h1>Only Heading</h1></body>", "https://example.com/");
        assert_eq!(page["title"], "Only Heading");
    }

    #[test]
    fn collects_recognized_meta_tags_only() {
        let page = parse_page(PAGE, "https://example.com/");
        let tags = &page["meta_tags"];
        assert_eq!(tags["charset"], "utf-8");
        assert_eq!(tags["description"], "A page for examples");
        assert_eq!(tags["twitter:card"], "summary");
        assert_eq!(tags["og:title"], "Example");
        assert!(tags.get("tracking-pixel").is_none());
    }

    #[test]
    fn image_urls_are_resolved_filtered_and_capped() {
        let images = extract_image_urls(PAGE, "https://example.com/gallery/", 5);
        // The svg is filtered out; the query string does not hide the jpg.
        assert_eq!(
            images,
            vec![
                "https://example.com/logo.png".to_string(),
                "https://example.com/gallery/photo.jpg?size=large".to_string(),
            ]
        );

        let capped = extract_image_urls(PAGE, "https://example.com/", 1);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn url_validation_rejects_non_http_schemes() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com/page").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(HarvestError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(HarvestError::InvalidRequest(_))
        ));
    }
}
