// Copyright 2026 CBE T-Bills Contributors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use cbe_tbills::calculator::DEFAULT_TAX_RATE_PERCENT;
use cbe_tbills::trend::{AggFunc, Aggregation};

mod cli;

#[derive(Parser)]
#[command(
    name = "cbe-tbills",
    about = "CBE T-Bills: Egyptian treasury-bill auction yields",
    version,
    after_help = "Run 'cbe-tbills <command> --help' for details on each command.\nRun 'cbe-tbills' with no command to fetch the latest auction results."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit log lines as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// SQLite database file (overrides CBE_TBILLS_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the auction page, extract yields and store them
    Fetch {
        /// Page to fetch (overrides CBE_TBILLS_URL)
        #[arg(long)]
        url: Option<String>,
        /// Maximum render+extract attempts (overrides CBE_TBILLS_MAX_ATTEMPTS)
        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Show the latest stored snapshot (seed data if nothing was fetched yet)
    Latest,
    /// Show yield history per tenor
    History {
        /// Only this tenor (days)
        #[arg(long)]
        tenor: Option<u32>,
        /// Bucket points by week or month
        #[arg(long, value_enum)]
        bucket: Option<Bucket>,
        /// How to reduce a bucket to one point
        #[arg(long, value_enum, default_value = "last")]
        agg: Agg,
    },
    /// Investment calculators
    Calc {
        #[command(subcommand)]
        action: CalcAction,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CalcAction {
    /// Buy at auction and hold to maturity
    Primary {
        /// Face value of the bills
        #[arg(long)]
        face: f64,
        /// Tenor in days
        #[arg(long)]
        tenor: u32,
        /// Accepted yield in percent (defaults to the latest stored yield for the tenor)
        #[arg(long = "yield")]
        yield_percent: Option<f64>,
        /// Tax rate on profit, in percent
        #[arg(long, default_value_t = DEFAULT_TAX_RATE_PERCENT)]
        tax: f64,
    },
    /// Sell before maturity on the secondary market
    Secondary {
        /// Face value of the bills
        #[arg(long)]
        face: f64,
        /// Original tenor in days
        #[arg(long)]
        tenor: u32,
        /// Yield at purchase, in percent
        #[arg(long = "yield")]
        yield_percent: f64,
        /// Days held before selling
        #[arg(long)]
        holding: u32,
        /// Yield the buyer demands at sale, in percent
        #[arg(long)]
        secondary_yield: f64,
        /// Tax rate on profit, in percent
        #[arg(long, default_value_t = DEFAULT_TAX_RATE_PERCENT)]
        tax: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Bucket {
    Week,
    Month,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Agg {
    Last,
    Avg,
    Min,
    Max,
}

fn aggregation(bucket: Option<Bucket>, agg: Agg) -> Aggregation {
    let func = match agg {
        Agg::Last => AggFunc::Last,
        Agg::Avg => AggFunc::Avg,
        Agg::Min => AggFunc::Min,
        Agg::Max => AggFunc::Max,
    };
    match bucket {
        None => Aggregation::Raw,
        Some(Bucket::Week) => Aggregation::Weekly(func),
        Some(Bucket::Month) => Aggregation::Monthly(func),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json {
        std::env::set_var("CBE_TBILLS_JSON", "1");
    }
    if cli.verbose {
        std::env::set_var("CBE_TBILLS_VERBOSE", "1");
    }
    cli::logging::init(cli.verbose, cli.log_json);

    let db = cli.db.as_deref();
    let result = match cli.command {
        // No subcommand → one fetch cycle
        None => cli::fetch_cmd::run(db, None, None).await,

        Some(Commands::Fetch { url, attempts }) => {
            cli::fetch_cmd::run(db, url.as_deref(), attempts).await
        }
        Some(Commands::Latest) => cli::latest_cmd::run(db),
        Some(Commands::History { tenor, bucket, agg }) => {
            cli::history_cmd::run(db, tenor, aggregation(bucket, agg))
        }
        Some(Commands::Calc { action }) => match action {
            CalcAction::Primary {
                face,
                tenor,
                yield_percent,
                tax,
            } => cli::calc_cmd::run_primary(db, face, tenor, yield_percent, tax),
            CalcAction::Secondary {
                face,
                tenor,
                yield_percent,
                holding,
                secondary_yield,
                tax,
            } => cli::calc_cmd::run_secondary(face, tenor, yield_percent, holding, secondary_yield, tax),
        },
        Some(Commands::Doctor) => cli::doctor::run(db).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cbe-tbills", &mut std::io::stdout());
            Ok(())
        }
    };

    // Exit codes: 0=success, 2..=5 classified pipeline failures, 1=anything else
    if let Err(e) = &result {
        let kind = cli::output::failure_kind(e);
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "kind": kind.map(|k| format!("{k:?}")),
                "message": format!("{e:#}"),
            }));
        } else {
            if let Some(kind) = kind {
                eprintln!("  {}", kind.message());
            }
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(kind.map(|k| k.exit_code()).unwrap_or(1));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_fetch() {
        let cli = Cli::try_parse_from(["cbe-tbills"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cbe-tbills", "latest", "--json", "--db", "/tmp/x.db"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Some(Commands::Latest)));
    }

    #[test]
    fn test_history_bucket_parsing() {
        let cli = Cli::try_parse_from([
            "cbe-tbills", "history", "--tenor", "91", "--bucket", "month", "--agg", "avg",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::History { tenor, bucket, agg }) => {
                assert_eq!(tenor, Some(91));
                assert_eq!(aggregation(bucket, agg), Aggregation::Monthly(AggFunc::Avg));
            }
            _ => panic!("expected history"),
        }
    }

    #[test]
    fn test_history_without_bucket_is_raw() {
        assert_eq!(aggregation(None, Agg::Max), Aggregation::Raw);
    }

    #[test]
    fn test_calc_primary_defaults_tax() {
        let cli = Cli::try_parse_from([
            "cbe-tbills", "calc", "primary", "--face", "100000", "--tenor", "364",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Calc {
                action:
                    CalcAction::Primary {
                        tax, yield_percent, ..
                    },
            }) => {
                assert_eq!(tax, DEFAULT_TAX_RATE_PERCENT);
                assert_eq!(yield_percent, None);
            }
            _ => panic!("expected calc primary"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
