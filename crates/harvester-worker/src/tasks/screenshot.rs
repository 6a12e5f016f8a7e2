//! Screenshot capture via a headless browser.
//!
//! Uses whichever Chromium-family binary is installed on the host. When
//! none is available the task yields `null` rather than failing, so a
//! worker host without a browser still serves the other task families.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::process::Command;
use std::time::Duration;

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Capture timeout handed to the browser, in milliseconds.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a usable browser binary is present on this host.
pub fn is_available() -> bool {
    find_browser().is_some()
}

/// Captures a screenshot of `url`, returning it as base64-encoded PNG.
///
/// Returns `None` when no browser is installed or the capture fails for
/// any reason; failures are logged, never propagated.
pub fn capture(url: &str) -> Option<String> {
    let browser = match find_browser() {
        Some(browser) => browser,
        None => {
            tracing::warn!("no headless browser available, screenshot skipped");
            return None;
        }
    };

    let dir = tempfile::tempdir()
        .map_err(|e| tracing::warn!(error = %e, "failed to create screenshot dir"))
        .ok()?;
    let output_path = dir.path().join("screenshot.png");

    let output = Command::new(&browser)
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--hide-scrollbars")
        .arg("--window-size=1280,1024")
        .arg(format!("--timeout={}", CAPTURE_TIMEOUT.as_millis()))
        .arg(format!("--screenshot={}", output_path.display()))
        .arg(url)
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let bytes = std::fs::read(&output_path)
                .map_err(|e| tracing::warn!(error = %e, "screenshot file unreadable"))
                .ok()?;
            Some(BASE64.encode(bytes))
        }
        Ok(output) => {
            tracing::warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "browser exited with failure"
            );
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to launch browser");
            None
        }
    }
}

fn find_browser() -> Option<String> {
    BROWSER_CANDIDATES
        .iter()
        .find(|candidate| {
            Command::new(candidate)
                .arg("--version")
                .output()
                .map(|out| out.status.success())
                .unwrap_or(false)
        })
        .map(|candidate| (*candidate).to_string())
}
