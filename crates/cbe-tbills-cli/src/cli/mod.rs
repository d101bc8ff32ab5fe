//! CLI subcommand implementations for the cbe-tbills binary.

pub mod calc_cmd;
pub mod doctor;
pub mod fetch_cmd;
pub mod history_cmd;
pub mod latest_cmd;
pub mod logging;
pub mod output;

use anyhow::{Context, Result};
use cbe_tbills::{QuoteStore, Settings};
use std::path::Path;

/// Resolve settings from the environment, then apply CLI overrides.
pub fn load_settings(db: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::from_env().context("invalid configuration")?;
    if let Some(db) = db {
        settings.db_path = db.to_path_buf();
    }
    settings.validate().context("invalid configuration")?;
    Ok(settings)
}

/// Open the quote store named by `settings`.
pub fn open_store(settings: &Settings) -> Result<QuoteStore> {
    Ok(QuoteStore::open(settings.db_path())?)
}
