//! Bounded retry around one render + extract cycle.
//!
//! ```text
//! Idle → Attempting → Success
//!            ↓  ↑
//!         RetryWait
//!            ↓
//!     ExhaustedFailure
//! ```
//!
//! Render and extraction failures are transient: they are logged, the loop
//! sleeps for the fixed delay and tries again. Anything outside that boundary
//! (notably storage) is not this loop's concern and is never retried here.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{ExtractionError, FetchError, RenderError};
use crate::renderer::PageRenderer;
use crate::types::AuctionQuote;

/// Attempt budget and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub render_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, render_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            render_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.retry_delay,
            settings.render_timeout,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Where the retry loop is. Logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting(u32),
    RetryWait(u32),
    Success(u32),
    ExhaustedFailure(u32),
}

/// Why a single attempt failed.
#[derive(Debug)]
pub enum AttemptFailure {
    Render(RenderError),
    Extract(ExtractionError),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Render(e) => write!(f, "render failed: {e}"),
            AttemptFailure::Extract(e) => write!(f, "extraction failed: {e}"),
        }
    }
}

impl AttemptFailure {
    /// Convert the final attempt's failure into the exhaustion error.
    fn exhausted(self, attempts: u32) -> FetchError {
        match self {
            AttemptFailure::Render(last @ RenderError::Setup(_)) => {
                FetchError::BrowserUnavailable { attempts, last }
            }
            AttemptFailure::Render(last) => FetchError::Unreachable { attempts, last },
            AttemptFailure::Extract(last) => FetchError::LayoutChanged { attempts, last },
        }
    }
}

/// Successful outcome of [`fetch_once`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub quotes: Vec<AuctionQuote>,
    /// 1-based attempt that succeeded.
    pub attempts: u32,
}

/// Render `url` and extract quotes, retrying up to `policy.max_attempts` times.
///
/// `extract` must return an error rather than an empty list; an `Ok(vec![])`
/// is still treated as a failed attempt.
pub async fn fetch_once<R, F>(
    renderer: &R,
    url: &str,
    extract: F,
    policy: &RetryPolicy,
) -> Result<Fetched, FetchError>
where
    R: PageRenderer + ?Sized,
    F: Fn(&str) -> Result<Vec<AuctionQuote>, ExtractionError>,
{
    let mut state = RetryState::Idle;
    let mut attempt = 0;

    loop {
        attempt += 1;
        state = transition(state, RetryState::Attempting(attempt));

        let failure = match renderer.render(url, policy.render_timeout).await {
            Err(e) => AttemptFailure::Render(e),
            Ok(html) => match extract(&html) {
                Ok(quotes) if !quotes.is_empty() => {
                    transition(state, RetryState::Success(attempt));
                    info!(attempt, rows = quotes.len(), "fetched auction quotes");
                    return Ok(Fetched {
                        quotes,
                        attempts: attempt,
                    });
                }
                Ok(_) => AttemptFailure::Extract(ExtractionError::NoValidSections {
                    rejected: Vec::new(),
                }),
                Err(e) => AttemptFailure::Extract(e),
            },
        };

        if attempt >= policy.max_attempts {
            transition(state, RetryState::ExhaustedFailure(attempt));
            let err = failure.exhausted(attempt);
            error!(kind = ?err.kind(), "fetch failed: {err}");
            return Err(err);
        }

        warn!(
            attempt,
            max_attempts = policy.max_attempts,
            "attempt failed, retrying in {}s: {failure}",
            policy.delay.as_secs()
        );
        state = transition(state, RetryState::RetryWait(attempt));
        tokio::time::sleep(policy.delay).await;
    }
}

fn transition(from: RetryState, to: RetryState) -> RetryState {
    tracing::debug!(?from, ?to, "retry state");
    to
}
