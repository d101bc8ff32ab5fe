//! Error taxonomy for the fetch pipeline.
//!
//! Render and extraction failures are transient and absorbed by the retry
//! loop. Storage failures are not retried and propagate unchanged. After the
//! retry budget is spent, [`FetchError`] keeps "browser missing", "site
//! unreachable" and "layout changed" apart so the surface can say which.

use std::time::Duration;
use thiserror::Error;

/// Failure to produce rendered HTML for the target page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The browser engine could not be started (binary missing, launch failure).
    #[error("browser engine unavailable: {0}")]
    Setup(String),

    /// The page did not show its ready marker within the timeout.
    #[error("page did not become ready within {}s (waiting for `{selector}`)", .after.as_secs())]
    Timeout { selector: String, after: Duration },

    /// Navigation itself failed (DNS, connection refused, TLS, ...).
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page loaded but its HTML could not be read back.
    #[error("failed to capture rendered HTML: {0}")]
    Capture(String),
}

/// Why a single results section was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRejection {
    /// Zero-based position of the results heading on the page.
    pub section: usize,
    pub reason: String,
}

/// The page loaded but no section matched the expected structure.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no results heading containing `{heading}` found")]
    NoResultsSection { heading: String },

    #[error("{} results section(s) found but none were valid: {}", .rejected.len(), summarize(.rejected))]
    NoValidSections { rejected: Vec<SectionRejection> },
}

fn summarize(rejected: &[SectionRejection]) -> String {
    rejected
        .iter()
        .map(|r| format!("#{}: {}", r.section, r.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Storage-layer fault (the persistence error class).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("refusing to store invalid quote (tenor {tenor_days}, yield {yield_percent})")]
    InvalidQuote { tenor_days: u32, yield_percent: f64 },

    #[error("corrupt row in store: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The retry budget was exhausted; classified by the last attempt's failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser engine unavailable after {attempts} attempt(s): {last}")]
    BrowserUnavailable { attempts: u32, last: RenderError },

    #[error("auction page unreachable after {attempts} attempt(s): {last}")]
    Unreachable { attempts: u32, last: RenderError },

    #[error("auction page structure not recognised after {attempts} attempt(s): {last}")]
    LayoutChanged { attempts: u32, last: ExtractionError },
}

/// Top-level failure of one fetch-and-store cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// User-facing failure classes; each has its own message and exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    BrowserUnavailable,
    NoConnection,
    LayoutChanged,
    Database,
}

impl FailureKind {
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::BrowserUnavailable => {
                "Chromium could not be started. Install Chrome/Chromium or set CBE_TBILLS_CHROMIUM_PATH."
            }
            FailureKind::NoConnection => {
                "The CBE website could not be reached. Check the internet connection and try again later."
            }
            FailureKind::LayoutChanged => {
                "The CBE page structure has changed. The extractor layout needs updating."
            }
            FailureKind::Database => "The local database could not be read or written.",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            FailureKind::BrowserUnavailable => 2,
            FailureKind::NoConnection => 3,
            FailureKind::LayoutChanged => 4,
            FailureKind::Database => 5,
        }
    }
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::BrowserUnavailable { attempts, .. }
            | FetchError::Unreachable { attempts, .. }
            | FetchError::LayoutChanged { attempts, .. } => *attempts,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::BrowserUnavailable { .. } => FailureKind::BrowserUnavailable,
            FetchError::Unreachable { .. } => FailureKind::NoConnection,
            FetchError::LayoutChanged { .. } => FailureKind::LayoutChanged,
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Fetch(e) => e.kind(),
            PipelineError::Store(_) => FailureKind::Database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds_are_distinct() {
        let kinds = [
            FailureKind::BrowserUnavailable,
            FailureKind::NoConnection,
            FailureKind::LayoutChanged,
            FailureKind::Database,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.exit_code(), b.exit_code());
                assert_ne!(a.message(), b.message());
            }
            assert_ne!(a.exit_code(), 0);
        }
    }

    #[test]
    fn test_pipeline_error_kind() {
        let fetch = PipelineError::from(FetchError::LayoutChanged {
            attempts: 3,
            last: ExtractionError::NoResultsSection {
                heading: "النتائج".into(),
            },
        });
        assert_eq!(fetch.kind(), FailureKind::LayoutChanged);

        let store = PipelineError::from(StoreError::Corrupt("bad date".into()));
        assert_eq!(store.kind(), FailureKind::Database);
    }

    #[test]
    fn test_no_valid_sections_message_lists_reasons() {
        let err = ExtractionError::NoValidSections {
            rejected: vec![
                SectionRejection {
                    section: 0,
                    reason: "2 tenors but 1 yields".into(),
                },
                SectionRejection {
                    section: 1,
                    reason: "no table after heading".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 results section(s)"));
        assert!(msg.contains("#0: 2 tenors but 1 yields"));
        assert!(msg.contains("#1: no table after heading"));
    }
}
