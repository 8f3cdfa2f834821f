//! Fetch orchestrator: downloads and extracts the archives of the items
//! selected for this run.
//!
//! Items are processed one at a time in catalog order. A failure while
//! processing one item (lookup, transfer, extraction, filesystem) is
//! logged and recorded in the [`RunReport`]; the run always moves on to
//! the next item. An archive the server reports as unavailable is not a
//! failure.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use seqfetch_api::ItemApi;
use seqfetch_api::progress::ProgressCallback;
use seqfetch_api_models::{Artifact, Item, ItemCode};

use crate::FetchError;
use crate::archive::extract_zip_blocking;
use crate::ledger::Ledger;

/// Per-run fetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Directory holding one subdirectory per item.
    pub destination_root: PathBuf,
    /// Maximum items processed by [`run`]; the rest are deferred.
    pub max_per_run: usize,
    /// Keep the `.zip` files next to their extracted directories.
    pub keep_archives: bool,
}

/// What happened to one archive of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Downloaded and extracted.
    Downloaded {
        /// Archive size in bytes.
        bytes: u64,
        /// Entries extracted from the archive.
        entries: u64,
    },
    /// The server has no such archive for this item.
    Unavailable,
}

impl ArtifactOutcome {
    #[must_use]
    pub const fn is_downloaded(self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Outcome of an item whose processing did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub code: ItemCode,
    /// Directory the archives were extracted into.
    pub item_dir: PathBuf,
    pub results: ArtifactOutcome,
    pub reads: ArtifactOutcome,
}

impl ItemOutcome {
    /// Outcome of one artifact.
    #[must_use]
    pub const fn artifact(&self, artifact: Artifact) -> ArtifactOutcome {
        match artifact {
            Artifact::Results => self.results,
            Artifact::Reads => self.reads,
        }
    }
}

/// An item whose processing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub code: ItemCode,
    pub reason: String,
}

/// Summary of a fetch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Items processing was attempted for.
    pub attempted: usize,
    /// Items left for a later run because of the per-run cap.
    pub deferred: usize,
    /// Items whose results archive was downloaded.
    pub results_downloaded: usize,
    /// Items whose reads archive was downloaded.
    pub reads_downloaded: usize,
    /// Archives the server reported as unavailable.
    pub unavailable: Vec<(ItemCode, Artifact)>,
    /// Items that failed, with the reason.
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    /// Number of items that failed.
    #[must_use]
    pub fn errored(&self) -> usize {
        self.failures.len()
    }

    fn record(&mut self, outcome: &ItemOutcome) {
        for artifact in Artifact::ALL {
            match (artifact, outcome.artifact(artifact)) {
                (Artifact::Results, ArtifactOutcome::Downloaded { .. }) => {
                    self.results_downloaded += 1;
                }
                (Artifact::Reads, ArtifactOutcome::Downloaded { .. }) => {
                    self.reads_downloaded += 1;
                }
                (_, ArtifactOutcome::Unavailable) => {
                    self.unavailable.push((outcome.code.clone(), artifact));
                }
            }
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} with results, {} with reads, {} errored, {} deferred",
            self.attempted,
            self.results_downloaded,
            self.reads_downloaded,
            self.errored(),
            self.deferred
        )?;

        for (code, artifact) in &self.unavailable {
            write!(f, "\n  {code}: no {artifact} available")?;
        }
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.code, failure.reason)?;
        }

        Ok(())
    }
}

/// Downloads the first `max_per_run` items and extracts them under the
/// destination root.
///
/// `progress` advances by one per item; `download_progress` receives the
/// byte counts of each archive transfer.
pub async fn run(
    api: &dyn ItemApi,
    ledger: &mut dyn Ledger,
    items: Vec<Item>,
    options: &FetchOptions,
    progress: &dyn ProgressCallback,
    download_progress: &dyn ProgressCallback,
) -> RunReport {
    for code in repeated_codes(&items) {
        log::warn!("Item {code} listed more than once");
    }

    let mut report = RunReport {
        deferred: items.len().saturating_sub(options.max_per_run),
        ..RunReport::default()
    };

    let selected: Vec<Item> = items.into_iter().take(options.max_per_run).collect();

    log::info!(
        "Downloading results for {} item(s): {}",
        selected.len(),
        selected
            .iter()
            .map(|item| item.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if report.deferred > 0 {
        log::info!("{} item(s) deferred to the next run", report.deferred);
    }

    progress.set_total(selected.len() as u64);

    for item in &selected {
        report.attempted += 1;
        progress.set_message(format!("Fetching {}", item.code));

        match fetch_item(api, ledger, &item.code, options, download_progress).await {
            Ok(outcome) => report.record(&outcome),
            Err(e) => {
                log::error!("Error downloading results for {}: {e}", item.code);
                report.failures.push(ItemFailure {
                    code: item.code.clone(),
                    reason: e.to_string(),
                });
            }
        }

        progress.inc(1);
    }

    progress.finish(format!("Fetched {} item(s)", selected.len()));
    log::info!("Run complete: {report}");

    report
}

/// Codes that occur more than once in `items`, each reported once, in
/// order of their second occurrence.
///
/// [`run`] does not drop repeats: a repeated item is fetched again and
/// counts once per occurrence in the [`RunReport`].
#[must_use]
pub fn repeated_codes(items: &[Item]) -> Vec<ItemCode> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    items
        .iter()
        .filter(|item| !seen.insert(&item.code) && reported.insert(&item.code))
        .map(|item| item.code.clone())
        .collect()
}

/// Downloads and extracts both archives of one item into
/// `{destination_root}/{code}/`.
///
/// The item is marked started in the ledger before anything is
/// downloaded, and marked complete only when both archives were either
/// extracted or reported unavailable.
///
/// # Errors
///
/// Returns [`FetchError`] on the first lookup, transfer, extraction, or
/// ledger failure.
pub async fn fetch_item(
    api: &dyn ItemApi,
    ledger: &mut dyn Ledger,
    code: &ItemCode,
    options: &FetchOptions,
    download_progress: &dyn ProgressCallback,
) -> Result<ItemOutcome, FetchError> {
    ledger.mark_started(code)?;

    let item_dir = options.destination_root.join(code.as_str());
    tokio::fs::create_dir_all(&item_dir)
        .await
        .map_err(|e| FetchError::Io {
            path: item_dir.display().to_string(),
            source: e,
        })?;

    let item = api.get_item(code).await?;
    log::info!(
        "Item {code}: {} ({}), {} sample(s), done {}",
        item.status,
        item.product_name,
        item.quantity,
        item.done_date.as_deref().unwrap_or("-")
    );

    let results = fetch_artifact(
        api,
        code,
        Artifact::Results,
        &item_dir,
        options.keep_archives,
        download_progress,
    )
    .await?;

    let reads = fetch_artifact(
        api,
        code,
        Artifact::Reads,
        &item_dir,
        options.keep_archives,
        download_progress,
    )
    .await?;

    ledger.mark_complete(code)?;

    Ok(ItemOutcome {
        code: code.clone(),
        item_dir,
        results,
        reads,
    })
}

/// Downloads one archive to `{item_dir}/{code}_{artifact}.zip` and
/// extracts it into `{item_dir}/{code}_{artifact}/`.
async fn fetch_artifact(
    api: &dyn ItemApi,
    code: &ItemCode,
    artifact: Artifact,
    item_dir: &Path,
    keep_archive: bool,
    download_progress: &dyn ProgressCallback,
) -> Result<ArtifactOutcome, FetchError> {
    log::info!("Downloading {artifact} for {code}");

    let Some(link) = api.artifact_link(code, artifact).await? else {
        return Ok(ArtifactOutcome::Unavailable);
    };

    let archive = item_dir.join(artifact.archive_name(code));
    let dest_dir = item_dir.join(artifact.dir_name(code));

    download_progress.set_message(format!("{code} {artifact}"));
    let bytes = api.download(&link, &archive, download_progress).await?;

    let entries = extract_zip_blocking(archive.clone(), dest_dir).await?;

    if !keep_archive && let Err(e) = tokio::fs::remove_file(&archive).await {
        log::warn!("Could not remove {}: {e}", archive.display());
    }

    Ok(ArtifactOutcome::Downloaded { bytes, entries })
}
