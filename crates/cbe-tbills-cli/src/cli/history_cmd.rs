//! CLI handler for the yield history view.

use anyhow::Result;
use std::path::Path;

use crate::cli::{load_settings, open_store, output};
use cbe_tbills::trend::{self, Aggregation};

/// Run the history command.
pub fn run(db: Option<&Path>, tenor: Option<u32>, aggregation: Aggregation) -> Result<()> {
    let settings = load_settings(db)?;
    let store = open_store(&settings)?;
    let history = store.history()?;
    let series = trend::series(&history, tenor, aggregation);

    if output::is_json() {
        output::print_json(&serde_json::json!({ "series": series }));
        return Ok(());
    }
    if series.is_empty() {
        println!("  No history data found. Run `cbe-tbills fetch` first.");
        return Ok(());
    }

    for s in &series {
        match s.change() {
            Some(delta) => println!("  {} days ({:+.3} pts):", s.tenor_days, delta),
            None => println!("  {} days:", s.tenor_days),
        }
        for (date, value) in &s.points {
            println!("    {}  {:.3}%", date.format("%Y-%m-%d"), value);
        }
        println!();
    }
    Ok(())
}
