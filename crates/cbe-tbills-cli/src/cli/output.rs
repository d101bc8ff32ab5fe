//! Output mode flags and shared printing helpers.

use cbe_tbills::error::StoreError;
use cbe_tbills::{FailureKind, PipelineError, Snapshot};
use serde::Serialize;

pub fn is_json() -> bool {
    std::env::var("CBE_TBILLS_JSON").is_ok()
}

pub fn is_verbose() -> bool {
    std::env::var("CBE_TBILLS_VERBOSE").is_ok()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not serialise output: {e}"),
    }
}

/// Classify an error that escaped a command, if it came from the pipeline
/// or the store.
pub fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return Some(e.kind());
    }
    err.downcast_ref::<StoreError>().map(|_| FailureKind::Database)
}

/// Human-readable rendering of a snapshot, grouped by session date.
pub fn print_snapshot(snapshot: &Snapshot) {
    println!("  Latest yields ({})", snapshot.label);
    println!();
    for (session, quotes) in snapshot.sessions() {
        println!("  Session {session}");
        for q in quotes {
            println!("    {:>4} days  {:>7.3}%", q.tenor_days, q.yield_percent);
        }
    }
}
