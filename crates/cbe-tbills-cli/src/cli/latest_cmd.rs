//! Show the latest stored snapshot.

use anyhow::Result;
use std::path::Path;

use crate::cli::{load_settings, open_store, output};

pub fn run(db: Option<&Path>) -> Result<()> {
    let settings = load_settings(db)?;
    let store = open_store(&settings)?;
    let snapshot = store.latest()?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "label": snapshot.label.to_string(),
            "is_seed": snapshot.label.is_seed(),
            "quotes": snapshot.quotes,
        }));
    } else {
        output::print_snapshot(&snapshot);
    }
    Ok(())
}
