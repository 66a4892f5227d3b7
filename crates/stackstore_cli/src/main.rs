//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `stackstore_core` linkage.
//! - Open the configured store and report how many stacks are public.
//!
//! Configuration comes from `STACKSTORE_*` environment variables; the
//! optional positional argument overrides `STACKSTORE_DB_PATH`.

use clap::Parser;
use stackstore_core::{StackSearchQuery, StackService, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Smoke-checks the stack store linkage and database.
#[derive(Parser, Debug)]
#[command(name = "stackstore", version)]
struct Cli {
    /// SQLite database file to probe (defaults to STACKSTORE_DB_PATH)
    db_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    println!("stackstore_core ping={}", stackstore_core::ping());
    println!("stackstore_core version={}", stackstore_core::core_version());

    let mut config = StoreConfig::from_env();
    if let Some(path) = cli.db_path {
        config.db_path = Some(path);
    }

    if let Err(err) = config.init_logging() {
        eprintln!("stackstore logging error={err}");
        return ExitCode::FAILURE;
    }

    let Some(db_path) = config.db_path.clone() else {
        return ExitCode::SUCCESS;
    };

    let service = match config.open_repository() {
        Ok(repo) => StackService::new(repo),
        Err(err) => {
            eprintln!("stackstore open error={err}");
            return ExitCode::FAILURE;
        }
    };

    match service.search(&StackSearchQuery::new()) {
        Ok(stacks) => {
            println!(
                "stackstore db={} public_stacks={}",
                db_path.display(),
                stacks.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("stackstore search error={err}");
            ExitCode::FAILURE
        }
    }
}
