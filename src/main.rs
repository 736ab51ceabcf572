//! Operator entry point.
//!
//! ```bash
//! tally-rs run
//! tally-rs backfill 2025-04-01 2025-10-11 --day-by-day --dry-run
//! tally-rs clear-and-reload 2025-04-01 2025-10-11
//! tally-rs sync-masters --from-file masters.xml --preview 10
//! tally-rs reconcile-bills
//! ```
//!
//! Configuration comes from the environment (TALLY_URL, TALLY_COMPANY,
//! DATABASE_URL, optional BATCH_DAYS and timeouts). Exit code 0 on success,
//! 1 on any error.

use chrono::{Local, NaiveDate};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tally_rs::client::TallyClient;
use tally_rs::config::Config;
use tally_rs::services::master_sync::{self, MasterSource};
use tally_rs::services::receivables;
use tally_rs::services::sync::{self, BackfillMode};
use tally_rs::{db, services};

const USAGE: &str = "Usage: tally-rs <command>

Commands:
  run                                        incremental load since the checkpoint
  backfill <from> <to> [--day-by-day] [--dry-run]
  clear-and-reload <from> <to> [--day-by-day] [--dry-run]
  sync-masters [--from-file <path>] [--dry-run] [--preview N]
  reconcile-bills                            rebuild bill-wise outstanding

Dates are YYYY-MM-DD.";

enum Command {
    Run,
    Backfill {
        from: NaiveDate,
        to: NaiveDate,
        mode: BackfillMode,
        dry_run: bool,
    },
    ClearAndReload {
        from: NaiveDate,
        to: NaiveDate,
        mode: BackfillMode,
        dry_run: bool,
    },
    SyncMasters {
        source: MasterSource,
        dry_run: bool,
        preview: Option<usize>,
    },
    ReconcileBills,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn parse_window_flags(rest: &[String]) -> Result<(BackfillMode, bool), String> {
    let mut mode = BackfillMode::Range;
    let mut dry_run = false;
    for flag in rest {
        match flag.as_str() {
            "--day-by-day" => mode = BackfillMode::DayByDay,
            "--dry-run" => dry_run = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok((mode, dry_run))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str).ok_or(USAGE.to_string())?;

    match command {
        "run" => Ok(Command::Run),
        "backfill" | "clear-and-reload" => {
            if args.len() < 3 {
                return Err(format!("{command} requires <from> and <to> dates\n\n{USAGE}"));
            }
            let from = parse_date_arg(&args[1])?;
            let to = parse_date_arg(&args[2])?;
            let (mode, dry_run) = parse_window_flags(&args[3..])?;
            if command == "backfill" {
                Ok(Command::Backfill {
                    from,
                    to,
                    mode,
                    dry_run,
                })
            } else {
                Ok(Command::ClearAndReload {
                    from,
                    to,
                    mode,
                    dry_run,
                })
            }
        }
        "sync-masters" => {
            let mut source = MasterSource::Source;
            let mut dry_run = false;
            let mut preview = None;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--from-source" => {
                        source = MasterSource::Source;
                        i += 1;
                    }
                    "--from-file" => {
                        let path = args
                            .get(i + 1)
                            .ok_or("--from-file requires a path".to_string())?;
                        source = MasterSource::File(PathBuf::from(path));
                        i += 2;
                    }
                    "--dry-run" => {
                        dry_run = true;
                        i += 1;
                    }
                    "--preview" => {
                        let n = args
                            .get(i + 1)
                            .ok_or("--preview requires a count".to_string())?;
                        preview = Some(
                            n.parse::<usize>()
                                .map_err(|_| format!("invalid preview count '{n}'"))?,
                        );
                        i += 2;
                    }
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            Ok(Command::SyncMasters {
                source,
                dry_run,
                preview,
            })
        }
        "reconcile-bills" => Ok(Command::ReconcileBills),
        other => Err(format!("unknown command: {other}\n\n{USAGE}")),
    }
}

async fn execute(command: Command) -> Result<(), services::EtlError> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            // Configuration problems are for the operator to fix, not retry.
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&config.database_url).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to connect to the warehouse: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        eprintln!("failed to apply migrations: {e}");
        std::process::exit(1);
    }

    let client = TallyClient::new(&config)?;

    match command {
        Command::Run => {
            sync::run_incremental(&pool, &client).await?;
        }
        Command::Backfill {
            from,
            to,
            mode,
            dry_run,
        } => {
            sync::run_backfill(&pool, &client, from, to, mode, dry_run, config.batch_days).await?;
        }
        Command::ClearAndReload {
            from,
            to,
            mode,
            dry_run,
        } => {
            sync::clear_and_reload(&pool, &client, from, to, mode, dry_run, config.batch_days)
                .await?;
        }
        Command::SyncMasters {
            source,
            dry_run,
            preview,
        } => {
            master_sync::sync_masters(&pool, &client, source, dry_run, preview).await?;
        }
        Command::ReconcileBills => {
            let written = receivables::reconcile_bills(&pool).await?;
            let today = Local::now().date_naive();
            for bill in receivables::outstanding_with_aging(&pool, today)
                .await?
                .iter()
                .take(20)
            {
                tracing::info!(
                    ledger = %bill.fact.ledger,
                    ref_name = %bill.fact.ref_name,
                    pending = %bill.fact.pending_amount,
                    bucket = bill.aging_bucket,
                    "outstanding"
                );
            }
            tracing::info!(rows = written, "reconciliation complete");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    match execute(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
