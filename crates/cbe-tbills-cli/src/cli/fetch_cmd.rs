//! Trigger one fetch-and-store cycle.

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use crate::cli::{load_settings, open_store, output};
use cbe_tbills::pipeline::update;
use cbe_tbills::renderer::chromium::ChromiumRenderer;
use cbe_tbills::renderer::{NoopRenderer, PageRenderer};
use cbe_tbills::{Extractor, PageLayout, RenderError, RetryPolicy, Settings};

/// Run the fetch command.
pub async fn run(db: Option<&Path>, url: Option<&str>, attempts: Option<u32>) -> Result<()> {
    let mut settings = load_settings(db)?;
    if let Some(url) = url {
        settings.url = url.to_string();
    }
    if let Some(attempts) = attempts {
        settings.max_attempts = attempts;
        settings.validate()?;
    }

    let extractor = match &settings.layout_file {
        Some(path) => Extractor::new(PageLayout::from_json_file(path)?),
        None => Extractor::default(),
    };
    let renderer = build_renderer(&settings);
    let policy = RetryPolicy::from_settings(&settings);
    let mut store = open_store(&settings)?;
    let today = chrono::Local::now().date_naive();

    let report = update(
        renderer.as_ref(),
        &extractor,
        &mut store,
        &settings.url,
        &policy,
        today,
    )
    .await?;

    if output::is_json() {
        output::print_json(&report);
        return Ok(());
    }

    println!(
        "  Stored {} quote(s) for {} after {} attempt(s).",
        report.rows_written, report.fetch_date, report.attempts
    );
    println!();
    output::print_snapshot(&store.latest()?);
    Ok(())
}

/// A missing browser still goes through the retry loop so it is reported
/// as a browser failure rather than a generic error.
fn build_renderer(settings: &Settings) -> Box<dyn PageRenderer> {
    match ChromiumRenderer::new(settings.chromium_path.as_deref(), settings.ready_selector.clone()) {
        Ok(renderer) => Box::new(renderer),
        Err(e) => {
            warn!(error = %e, "Chromium unavailable");
            let reason = match e {
                RenderError::Setup(reason) => reason,
                other => other.to_string(),
            };
            Box::new(NoopRenderer::new(reason))
        }
    }
}
