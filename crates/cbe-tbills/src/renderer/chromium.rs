//! Chromium-based renderer using chromiumoxide.
//!
//! Each `render` call launches one headless browser and tears it down before
//! returning, on success, error and timeout alike. If the render future is
//! dropped mid-flight, the browser child is killed on drop and the CDP
//! handler task is aborted.

use super::PageRenderer;
use crate::error::RenderError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// How often the ready marker is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on waiting for the browser process to exit after `close`.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Configured path (flag or CBE_TBILLS_CHROMIUM_PATH)
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    // 2. ~/.cbe-tbills/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".cbe-tbills/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".cbe-tbills/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![
                home.join(".cbe-tbills/chromium/chrome-linux64/chrome"),
                home.join(".cbe-tbills/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches a fresh headless Chromium for every render.
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
    ready_selector: String,
}

impl ChromiumRenderer {
    /// Locate Chromium; fails with [`RenderError::Setup`] if it is missing.
    ///
    /// No process is started here.
    pub fn new(explicit: Option<&Path>, ready_selector: impl Into<String>) -> Result<Self, RenderError> {
        let chrome_path = find_chromium(explicit).ok_or_else(|| match explicit {
            Some(path) => RenderError::Setup(format!("Chromium not found at {}", path.display())),
            None => RenderError::Setup(
                "Chromium not found. Install Chrome/Chromium or set CBE_TBILLS_CHROMIUM_PATH."
                    .to_string(),
            ),
        })?;
        debug!("using Chromium at {}", chrome_path.display());
        Ok(Self {
            chrome_path,
            ready_selector: ready_selector.into(),
        })
    }

    pub fn chrome_path(&self) -> &Path {
        &self.chrome_path
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, RenderError> {
        let start = Instant::now();
        let session = BrowserSession::launch(&self.chrome_path).await?;

        let outcome = tokio::time::timeout(timeout, session.load(url, &self.ready_selector)).await;
        session.shutdown().await;

        match outcome {
            Ok(Ok(html)) => {
                info!(
                    bytes = html.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "rendered {url}"
                );
                Ok(html)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RenderError::Timeout {
                selector: self.ready_selector.clone(),
                after: timeout,
            }),
        }
    }
}

/// One browser process plus its CDP event loop.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(chrome_path: &Path) -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!("--user-agent={USER_AGENT}"))
            .window_size(1920, 1080)
            .build()
            .map_err(|e| RenderError::Setup(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Setup(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!("CDP handler event error: {e}");
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Navigate, wait for the ready marker, and capture the DOM.
    async fn load(&self, url: &str, ready_selector: &str) -> Result<String, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Setup(format!("failed to open a tab: {e}")))?;

        page.goto(url).await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        wait_for_selector(&page, ready_selector).await;

        page.evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::Capture(format!("failed to convert HTML result: {e:?}")))
    }

    /// Close the browser and reap the process; kill it if it lingers.
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close failed: {e}");
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, self.browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("waiting for browser exit failed: {e}"),
            Err(_) => {
                warn!("browser did not exit within {}s; killing it", SHUTDOWN_GRACE.as_secs());
                if let Some(Err(e)) = self.browser.kill().await {
                    warn!("failed to kill browser: {e}");
                }
            }
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Poll until `selector` matches an element. Callers bound this with a timeout.
async fn wait_for_selector(page: &Page, selector: &str) {
    loop {
        if page.find_element(selector).await.is_ok() {
            debug!("ready marker `{selector}` present");
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_path_is_setup_error() {
        let err = ChromiumRenderer::new(Some(Path::new("/nonexistent/chrome")), "h2")
            .err()
            .expect("renderer should not be created");
        assert!(matches!(err, RenderError::Setup(ref msg) if msg.contains("/nonexistent/chrome")));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_waits_for_marker() {
        let renderer = ChromiumRenderer::new(None, "h2").expect("Chromium not found");
        let html = renderer
            .render(
                "data:text/html,<h2>النتائج</h2><table><tr><th>x</th><th>91</th></tr></table>",
                Duration::from_secs(30),
            )
            .await
            .expect("render failed");
        assert!(html.contains("<h2>"));
        assert!(html.contains("91"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_times_out_without_marker() {
        let renderer = ChromiumRenderer::new(None, "h2.never-present").expect("Chromium not found");
        let err = renderer
            .render("data:text/html,<p>empty</p>", Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
    }
}
