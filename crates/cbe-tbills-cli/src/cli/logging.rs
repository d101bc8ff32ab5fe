//! Tracing subscriber setup. Logs go to stderr so `--json` output stays clean.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "cbe_tbills=info";
const VERBOSE_DIRECTIVE: &str = "cbe_tbills=debug";

/// `RUST_LOG` wins over the flag-derived default.
pub fn filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { VERBOSE_DIRECTIVE } else { DEFAULT_DIRECTIVE };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub fn init(verbose: bool, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("  Warning: logging not initialised: {e}");
    }
}
