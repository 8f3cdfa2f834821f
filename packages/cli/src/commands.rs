//! Subcommand implementations shared by the CLI and the interactive menu.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use seqfetch_api::{ApiClient, ApiConfig, ItemApi};
use seqfetch_api_models::{Artifact, Item, ItemCode};
use seqfetch_cli_utils::{IndicatifProgress, MultiProgress};
use seqfetch_sync::config::ConfigFile;
use seqfetch_sync::ledger::{MemoryLedger, open_ledger, select_undownloaded};
use seqfetch_sync::orchestrator::{self, ArtifactOutcome, ItemOutcome};
use seqfetch_sync::readiness::select_ready;
use seqfetch_sync::report::{csv_path_for_prefix, write_ready_csv};
use seqfetch_sync::{FetchOptions, LedgerKind, RunConfiguration};

/// Items and samples printed by [`intro`].
const PREVIEW_COUNT: usize = 3;

/// Values given on the command line. `None` (or `false`) leaves the
/// config file or default value in place.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub max_per_run: Option<usize>,
    pub after: Option<DateTime<Utc>>,
    pub keep_archives: bool,
    pub ledger: Option<LedgerKind>,
}

/// Merges defaults, the optional config file, and command-line values
/// (in increasing precedence). Also returns the API settings.
fn resolve(
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<(RunConfiguration, ApiConfig), Box<dyn std::error::Error>> {
    let file = match config_path {
        Some(path) => {
            log::debug!("Loading config from {}", path.display());
            ConfigFile::load(path)?
        }
        None => ConfigFile::default(),
    };

    let mut config = RunConfiguration::from_file(&file)?;
    if let Some(dir) = &overrides.data_dir {
        config.destination_root.clone_from(dir);
    }
    if let Some(max) = overrides.max_per_run {
        config.max_per_run = max;
    }
    if let Some(after) = overrides.after {
        config.cutoff = after;
    }
    if overrides.keep_archives {
        config.keep_archives = true;
    }
    if let Some(ledger) = overrides.ledger {
        config.ledger = ledger;
    }

    let mut api = ApiConfig::from_env()?;
    if std::env::var_os("PLASMIDSAURUS_API_URL").is_none()
        && let Some(url) = &file.api_url
    {
        api = ApiConfig::new(url, api.client_id, api.client_secret);
    }

    log::debug!("{config:?}");
    log::debug!("{api:?}");

    Ok((config, api))
}

/// Token, catalog, readiness, ledger, then the fetch run.
///
/// # Errors
///
/// Returns an error if configuration, authentication, the catalog
/// listing, or opening the ledger fails. Per-item failures are only
/// reported.
pub async fn auto_fetch(
    multi: &MultiProgress,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, api_config) = resolve(config_path, overrides)?;
    let client = ApiClient::connect(&api_config).await?;

    let items = client.list_items().await?;
    let ready = select_ready(items, config.cutoff);

    let mut ledger = open_ledger(config.ledger, &config.destination_root)?;
    let pending = select_undownloaded(ready, ledger.as_ref());

    if pending.is_empty() {
        log::info!("Nothing new to download");
        return Ok(());
    }

    let items_bar = IndicatifProgress::items_bar(multi, "Items");
    let bytes_bar = IndicatifProgress::bytes_bar(multi, "Downloading");

    let report = orchestrator::run(
        &client,
        ledger.as_mut(),
        pending,
        &FetchOptions::from(&config),
        items_bar.as_ref(),
        bytes_bar.as_ref(),
    )
    .await;

    bytes_bar.finish_and_clear();
    println!("{report}");

    Ok(())
}

/// Downloads one item regardless of readiness or ledger state.
///
/// Exits the process with status 1 if the item fails.
///
/// # Errors
///
/// Returns an error if configuration, authentication, or opening the
/// ledger fails.
pub async fn download(
    multi: &MultiProgress,
    code: &ItemCode,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, api_config) = resolve(None, overrides)?;
    let client = ApiClient::connect(&api_config).await?;
    let mut ledger = open_ledger(config.ledger, &config.destination_root)?;
    let bytes_bar = IndicatifProgress::bytes_bar(multi, "Downloading");

    let result = orchestrator::fetch_item(
        &client,
        ledger.as_mut(),
        code,
        &FetchOptions::from(&config),
        bytes_bar.as_ref(),
    )
    .await;
    bytes_bar.finish_and_clear();

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            log::error!("Error downloading results for {code}: {e}");
            std::process::exit(1);
        }
    }
}

/// Writes the ready items (readiness filter only, no ledger) to CSV.
///
/// # Errors
///
/// Returns an error if configuration, authentication, the catalog
/// listing, or writing the file fails.
pub async fn list_ready(
    out_prefix: &str,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, api_config) = resolve(config_path, overrides)?;
    let client = ApiClient::connect(&api_config).await?;

    let items = client.list_items().await?;
    let ready = select_ready(items, config.cutoff);

    let path = csv_path_for_prefix(out_prefix);
    let rows = write_ready_csv(&path, &ready, client.base_url())?;
    println!("{rows} ready item(s) written to {}", path.display());

    Ok(())
}

/// Guided tour of the API: lists items, inspects the first complete item
/// that has results, and downloads it.
///
/// Exits the process with status 1 if there are no items, or none with
/// results.
///
/// # Errors
///
/// Returns an error if configuration, authentication, or any request
/// fails.
pub async fn intro(
    multi: &MultiProgress,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, api_config) = resolve(None, overrides)?;
    let client = ApiClient::connect(&api_config).await?;

    let items = client.list_items().await?;
    if items.is_empty() {
        println!("No items found for these credentials.");
        std::process::exit(1);
    }

    println!("Found {} item(s), showing the first {PREVIEW_COUNT}:", items.len());
    for item in items.iter().take(PREVIEW_COUNT) {
        print_item(item);
    }
    println!();

    let Some(example) = items
        .iter()
        .find(|item| item.is_complete() && item.product_name.has_results())
    else {
        println!("No complete items with results found.");
        std::process::exit(1);
    };

    let item = client.get_item(&example.code).await?;
    println!("Example item:");
    print_item(&item);

    let samples = client.samples(&item.code).await?;
    println!(
        "{} sample(s), showing the first {PREVIEW_COUNT}:",
        samples.len()
    );
    for sample in samples.iter().take(PREVIEW_COUNT) {
        println!(
            "  {:<24} {:<10} {} assemblies",
            sample.name,
            sample.status,
            sample.assemblies.len()
        );
        for assembly in &sample.assemblies {
            println!(
                "    {} bp, {:.1}x coverage, {} reads",
                assembly.length, assembly.coverage, assembly.n_reads
            );
        }
    }
    println!();

    let bytes_bar = IndicatifProgress::bytes_bar(multi, "Downloading");
    let outcome = orchestrator::fetch_item(
        &client,
        &mut MemoryLedger::new(),
        &item.code,
        &FetchOptions::from(&config),
        bytes_bar.as_ref(),
    )
    .await?;
    bytes_bar.finish_and_clear();

    print_outcome(&outcome);

    Ok(())
}

fn print_item(item: &Item) {
    println!(
        "  {}  {:<10} {:<24} x{:<3} {:>8.2}  done {}",
        item.code,
        item.status,
        item.product_name,
        item.quantity,
        item.gross,
        item.done_date.as_deref().unwrap_or("-")
    );
}

fn print_outcome(outcome: &ItemOutcome) {
    for artifact in Artifact::ALL {
        match outcome.artifact(artifact) {
            ArtifactOutcome::Downloaded { bytes, entries } => println!(
                "{artifact}: {bytes} bytes, {entries} file(s) in {}",
                outcome
                    .item_dir
                    .join(artifact.dir_name(&outcome.code))
                    .display()
            ),
            ArtifactOutcome::Unavailable => {
                println!("No {artifact} found for {}", outcome.code);
            }
        }
    }
}
