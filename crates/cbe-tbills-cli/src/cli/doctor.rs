//! Environment readiness check.

use anyhow::Result;
use std::path::Path;

use crate::cli::{load_settings, output};
use cbe_tbills::renderer::chromium::find_chromium;
use cbe_tbills::{PageLayout, QuoteStore};

/// Check Chromium availability, configuration, layout and database.
pub async fn run(db: Option<&Path>) -> Result<()> {
    let settings = load_settings(db)?;
    let chromium = find_chromium(settings.chromium_path.as_deref());

    let layout = settings.layout_file.as_deref().map(PageLayout::from_json_file);
    let layout_status = match &layout {
        None => "built-in".to_string(),
        Some(Ok(_)) => "custom (loaded)".to_string(),
        Some(Err(e)) => format!("custom (invalid: {e})"),
    };

    let store = QuoteStore::open(settings.db_path());
    let (db_ok, rows, dates) = match &store {
        Ok(store) => (
            true,
            store.row_count().ok(),
            store.fetch_dates().map(|d| d.len()).ok(),
        ),
        Err(_) => (false, None, None),
    };

    let ready = chromium.is_some() && db_ok && !matches!(layout, Some(Err(_)));

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium,
            "settings": settings,
            "layout": layout_status,
            "database": {
                "ok": db_ok,
                "rows": rows,
                "fetch_dates": dates,
                "error": store.as_ref().err().map(|e| e.to_string()),
            },
            "ready": ready,
        }));
        return Ok(());
    }

    println!("CBE T-Bills Doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!("URL:  {}", settings.url);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome/Chromium or set CBE_TBILLS_CHROMIUM_PATH."),
    }

    match &store {
        Ok(_) => println!(
            "[OK] Database {}: {} row(s) over {} fetch date(s)",
            settings.db_path().display(),
            rows.unwrap_or(0),
            dates.unwrap_or(0),
        ),
        Err(e) => println!("[!!] Database {}: {e}", settings.db_path().display()),
    }

    match &layout {
        Some(Err(_)) => println!("[!!] Page layout: {layout_status}"),
        _ => println!("[OK] Page layout: {layout_status}"),
    }

    if output::is_verbose() {
        println!();
        println!("Attempts:       {}", settings.max_attempts);
        println!("Retry delay:    {}s", settings.retry_delay.as_secs());
        println!("Render timeout: {}s", settings.render_timeout.as_secs());
        println!("Ready selector: {}", settings.ready_selector);
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
