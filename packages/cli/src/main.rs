#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `seqfetch`: keeps a local directory in sync with completed sequencing
//! results.
//!
//! Meant to be run periodically (e.g. from cron). Each `auto-fetch` run
//! downloads at most a few newly completed items and leaves the rest for
//! the next invocation. Credentials come from `PLASMIDSAURUS_CLIENT_ID`
//! and `PLASMIDSAURUS_CLIENT_SECRET`.
//!
//! Without a subcommand an interactive menu is shown.

mod commands;
mod interactive;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use seqfetch_api_models::ItemCode;
use seqfetch_sync::LedgerKind;
use seqfetch_sync::config::parse_cutoff;
use seqfetch_sync::report::DEFAULT_OUT_PREFIX;

use crate::commands::Overrides;

#[derive(Parser)]
#[command(name = "seqfetch", about = "Download completed sequencing results")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download results for newly completed items not yet on disk
    AutoFetch {
        /// Directory holding one subdirectory per item
        #[arg(long = "data_dir")]
        data_dir: Option<PathBuf>,
        /// Maximum number of items to download in this run (default: 3)
        #[arg(long)]
        max_per_run: Option<usize>,
        /// Only items completed after this instant (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_after)]
        after: Option<DateTime<Utc>>,
        /// Keep the downloaded zip files after extraction
        #[arg(long)]
        keep_archives: bool,
        /// How already-downloaded items are detected
        #[arg(long, value_parser = parse_ledger)]
        ledger: Option<LedgerKind>,
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Download the results and reads of a single item
    Download {
        /// Six-character item code (e.g. "`ABC123`")
        #[arg(long = "item_code")]
        item_code: ItemCode,
        /// Directory holding one subdirectory per item
        #[arg(long = "data_dir")]
        data_dir: Option<PathBuf>,
        /// Keep the downloaded zip files after extraction
        #[arg(long)]
        keep_archives: bool,
        /// Ledger to record the download in
        #[arg(long, value_parser = parse_ledger)]
        ledger: Option<LedgerKind>,
    },
    /// Write the items ready for download to a CSV file
    ListReady {
        /// Output path without the `.csv` extension
        #[arg(long, default_value = DEFAULT_OUT_PREFIX)]
        out_prefix: String,
        /// Only items completed after this instant (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_after)]
        after: Option<DateTime<Utc>>,
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Walk through the API: list items, inspect one, download it
    Intro {
        /// Directory to download the example item into
        #[arg(long = "data_dir")]
        data_dir: Option<PathBuf>,
    },
}

fn parse_after(value: &str) -> Result<DateTime<Utc>, String> {
    parse_cutoff(value).map_err(|e| e.to_string())
}

fn parse_ledger(value: &str) -> Result<LedgerKind, String> {
    value
        .parse()
        .map_err(|_| format!("expected \"directory\" or \"marker\", got {value:?}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = seqfetch_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::AutoFetch {
            data_dir,
            max_per_run,
            after,
            keep_archives,
            ledger,
            config,
        } => {
            let overrides = Overrides {
                data_dir,
                max_per_run,
                after,
                keep_archives,
                ledger,
            };
            commands::auto_fetch(&multi, config.as_deref(), &overrides).await?;
        }
        Commands::Download {
            item_code,
            data_dir,
            keep_archives,
            ledger,
        } => {
            let overrides = Overrides {
                data_dir,
                keep_archives,
                ledger,
                ..Overrides::default()
            };
            commands::download(&multi, &item_code, &overrides).await?;
        }
        Commands::ListReady {
            out_prefix,
            after,
            config,
        } => {
            let overrides = Overrides {
                after,
                ..Overrides::default()
            };
            commands::list_ready(&out_prefix, config.as_deref(), &overrides).await?;
        }
        Commands::Intro { data_dir } => {
            let overrides = Overrides {
                data_dir,
                ..Overrides::default()
            };
            commands::intro(&multi, &overrides).await?;
        }
    }

    Ok(())
}
