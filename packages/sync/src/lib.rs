#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incremental sync of completed sequencing items into a local directory.
//!
//! A run goes through three stages:
//!
//! 1. [`readiness::select_ready`] keeps complete items finished after the
//!    cutoff.
//! 2. [`ledger::select_undownloaded`] drops items already present locally.
//! 3. [`orchestrator::run`] downloads and extracts up to `max_per_run` of
//!    the remainder, one item at a time.
//!
//! [`report`] writes the same ready set out as CSV without downloading.

pub mod archive;
pub mod config;
pub mod ledger;
pub mod orchestrator;
pub mod readiness;
pub mod report;

use seqfetch_api::ApiError;

use crate::archive::ArchiveError;
use crate::ledger::LedgerError;

pub use config::RunConfiguration;
pub use ledger::{Ledger, LedgerKind};
pub use orchestrator::{FetchOptions, RunReport};

/// Errors that end the processing of a single item.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// API lookup or transfer failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Downloaded archive could not be extracted.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Ledger state could not be written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// I/O error preparing the item directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl From<&RunConfiguration> for FetchOptions {
    fn from(config: &RunConfiguration) -> Self {
        Self {
            destination_root: config.destination_root.clone(),
            max_per_run: config.max_per_run,
            keep_archives: config.keep_archives,
        }
    }
}
