//! Core record types shared by the extractor, store and views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Session date recorded when the published date cannot be recovered.
pub const UNKNOWN_SESSION_DATE: &str = "unknown";

/// Storage format for fetch dates (ISO 8601 calendar date).
pub const FETCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// One tenor's accepted weighted-average yield from one auction session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionQuote {
    /// Maturity length in days.
    pub tenor_days: u32,
    /// Annualized accepted weighted-average yield, in percent.
    pub yield_percent: f64,
    /// Auction session date as published, or [`UNKNOWN_SESSION_DATE`].
    pub session_date: String,
    /// Date the pipeline harvested this row; acts as the snapshot version.
    pub fetch_date: NaiveDate,
}

impl AuctionQuote {
    pub fn new(
        tenor_days: u32,
        yield_percent: f64,
        session_date: impl Into<String>,
        fetch_date: NaiveDate,
    ) -> Self {
        Self {
            tenor_days,
            yield_percent,
            session_date: session_date.into(),
            fetch_date,
        }
    }

    /// Whether the row satisfies `tenor_days > 0` and a finite `yield_percent > 0`.
    pub fn is_valid(&self) -> bool {
        self.tenor_days > 0 && self.yield_percent.is_finite() && self.yield_percent > 0.0
    }
}

/// Where a [`Snapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "fetch_date", rename_all = "snake_case")]
pub enum SnapshotLabel {
    /// Rows persisted by a successful fetch on this date.
    Fetched(NaiveDate),
    /// Hardcoded seed rows; the store has never been written.
    Seed,
}

impl SnapshotLabel {
    pub fn is_seed(&self) -> bool {
        matches!(self, SnapshotLabel::Seed)
    }
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotLabel::Fetched(date) => write!(f, "as of {}", date.format("%d-%m-%Y")),
            SnapshotLabel::Seed => write!(f, "[seed] initial data, no successful fetch yet"),
        }
    }
}

/// The latest row set plus a label saying whether it is real or seed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub quotes: Vec<AuctionQuote>,
    pub label: SnapshotLabel,
}

impl Snapshot {
    /// Yield for a tenor, if present in this snapshot.
    pub fn yield_for(&self, tenor_days: u32) -> Option<f64> {
        self.quotes
            .iter()
            .find(|q| q.tenor_days == tenor_days)
            .map(|q| q.yield_percent)
    }

    /// Tenors in ascending order.
    pub fn tenors(&self) -> Vec<u32> {
        let mut tenors: Vec<u32> = self.quotes.iter().map(|q| q.tenor_days).collect();
        tenors.sort_unstable();
        tenors.dedup();
        tenors
    }

    /// Quotes grouped by published session date, tenors ascending within a group.
    pub fn sessions(&self) -> BTreeMap<String, Vec<AuctionQuote>> {
        let mut groups: BTreeMap<String, Vec<AuctionQuote>> = BTreeMap::new();
        for quote in &self.quotes {
            groups
                .entry(quote.session_date.clone())
                .or_default()
                .push(quote.clone());
        }
        for quotes in groups.values_mut() {
            quotes.sort_by_key(|q| q.tenor_days);
        }
        groups
    }
}
