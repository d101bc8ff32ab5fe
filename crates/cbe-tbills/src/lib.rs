// Copyright 2026 CBE T-Bills Contributors
// SPDX-License-Identifier: MIT

//! CBE T-Bills: Egyptian treasury-bill auction yields.
//!
//! The crate renders the Central Bank of Egypt auction-results page in a
//! headless browser, reduces it to typed [`AuctionQuote`] rows, retries
//! transient failures, and persists snapshots keyed by fetch date.
//!
//! Data flow: [`pipeline::update`] → [`retry::fetch_once`] →
//! ([`renderer::PageRenderer`] → HTML → [`extract::Extractor`]) → [`store::QuoteStore`].

pub mod calculator;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod renderer;
pub mod retry;
pub mod store;
pub mod trend;
pub mod types;

pub use config::Settings;
pub use error::{ExtractionError, FailureKind, FetchError, PipelineError, RenderError, StoreError};
pub use extract::{Extractor, PageLayout};
pub use pipeline::UpdateReport;
pub use retry::RetryPolicy;
pub use store::QuoteStore;
pub use types::{AuctionQuote, Snapshot, SnapshotLabel, UNKNOWN_SESSION_DATE};
