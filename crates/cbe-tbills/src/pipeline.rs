//! One fetch-and-store cycle.
//!
//! The caller supplies the renderer and the store; nothing here is global.
//! Rows reach the store only after a successful fetch, so an exhausted retry
//! budget leaves stored data untouched.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::renderer::PageRenderer;
use crate::retry::{fetch_once, RetryPolicy};
use crate::store::QuoteStore;

/// What a successful cycle wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub fetch_date: NaiveDate,
    pub rows_written: usize,
    pub attempts: u32,
    /// Tenors written, ascending, without duplicates.
    pub tenors: Vec<u32>,
}

/// Render, extract (with retry) and upsert the quotes for `fetch_date`.
pub async fn update<R>(
    renderer: &R,
    extractor: &Extractor,
    store: &mut QuoteStore,
    url: &str,
    policy: &RetryPolicy,
    fetch_date: NaiveDate,
) -> Result<UpdateReport, PipelineError>
where
    R: PageRenderer + ?Sized,
{
    info!(%url, %fetch_date, max_attempts = policy.max_attempts, "starting fetch cycle");

    let fetched = fetch_once(renderer, url, |html| extractor.extract(html, fetch_date), policy).await?;
    let rows_written = store.upsert(&fetched.quotes)?;

    let mut tenors: Vec<u32> = fetched.quotes.iter().map(|q| q.tenor_days).collect();
    tenors.sort_unstable();
    tenors.dedup();

    info!(rows_written, attempts = fetched.attempts, ?tenors, "fetch cycle complete");
    Ok(UpdateReport {
        fetch_date,
        rows_written,
        attempts: fetched.attempts,
        tenors,
    })
}
