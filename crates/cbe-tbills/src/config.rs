//! Runtime settings: built-in defaults, then environment overrides.
//!
//! The binary applies its own flags on top of [`Settings::from_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// CBE Arabic T-bill auctions page.
pub const DEFAULT_URL: &str = "https://www.cbe.org.eg/ar/auctions/egp-t-bills";

/// Database file name inside the data directory.
pub const DB_FILENAME: &str = "cbe_historical_data.db";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// The auction tables are injected after the page's first `h2` heading appears.
pub const DEFAULT_READY_SELECTOR: &str = "h2";

const ENV_URL: &str = "CBE_TBILLS_URL";
const ENV_DB: &str = "CBE_TBILLS_DB";
const ENV_MAX_ATTEMPTS: &str = "CBE_TBILLS_MAX_ATTEMPTS";
const ENV_RETRY_DELAY: &str = "CBE_TBILLS_RETRY_DELAY_SECS";
const ENV_RENDER_TIMEOUT: &str = "CBE_TBILLS_RENDER_TIMEOUT_SECS";
const ENV_READY_SELECTOR: &str = "CBE_TBILLS_READY_SELECTOR";
const ENV_CHROMIUM_PATH: &str = "CBE_TBILLS_CHROMIUM_PATH";
const ENV_LAYOUT_FILE: &str = "CBE_TBILLS_LAYOUT_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Everything the fetch cycle needs to know, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub url: String,
    pub db_path: PathBuf,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub render_timeout: Duration,
    pub ready_selector: String,
    pub chromium_path: Option<PathBuf>,
    pub layout_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            db_path: default_db_path(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
            chromium_path: None,
            layout_file: None,
        }
    }
}

impl Settings {
    /// Defaults overridden by `CBE_TBILLS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(url) = lookup(ENV_URL) {
            settings.url = url;
        }
        if let Some(path) = lookup(ENV_DB) {
            settings.db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            settings.max_attempts = parse_u64(ENV_MAX_ATTEMPTS, &raw)
                .and_then(|n| {
                    u32::try_from(n).map_err(|_| ConfigError::InvalidValue {
                        var: ENV_MAX_ATTEMPTS,
                        value: raw.clone(),
                        expected: "attempt count",
                    })
                })?;
        }
        if let Some(raw) = lookup(ENV_RETRY_DELAY) {
            settings.retry_delay = Duration::from_secs(parse_u64(ENV_RETRY_DELAY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_RENDER_TIMEOUT) {
            settings.render_timeout = Duration::from_secs(parse_u64(ENV_RENDER_TIMEOUT, &raw)?);
        }
        if let Some(selector) = lookup(ENV_READY_SELECTOR) {
            settings.ready_selector = selector;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            settings.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_LAYOUT_FILE) {
            settings.layout_file = Some(PathBuf::from(path));
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        expected: "non-negative integer",
    })
}

/// `~/.cbe-tbills/cbe_historical_data.db`, or the working directory without a home.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cbe-tbills"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DB_FILENAME)
}
