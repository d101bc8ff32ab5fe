//! Renderer abstraction for loading the auction page with JavaScript executed.
//!
//! The auction tables are injected client-side, so a plain GET is not enough.
//! Implementations wait for a structural ready marker rather than sleeping.

pub mod chromium;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::RenderError;

/// Something that turns a URL into fully rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, wait until the page is ready (bounded by `timeout`) and
    /// return the document's outer HTML.
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, RenderError>;
}

/// Serves a fixed HTML document; for offline runs and tests.
pub struct StaticRenderer {
    html: String,
}

impl StaticRenderer {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, _url: &str, _timeout: Duration) -> Result<String, RenderError> {
        Ok(self.html.clone())
    }
}

/// A renderer used when no browser is available; every call fails with
/// [`RenderError::Setup`].
pub struct NoopRenderer {
    reason: String,
}

impl NoopRenderer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PageRenderer for NoopRenderer {
    async fn render(&self, _url: &str, _timeout: Duration) -> Result<String, RenderError> {
        Err(RenderError::Setup(self.reason.clone()))
    }
}
