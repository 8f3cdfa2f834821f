//! CSV listing of items that are ready to download.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use seqfetch_api::client::reads_url;
use seqfetch_api_models::Item;

/// Default output prefix for the ready-items CSV.
pub const DEFAULT_OUT_PREFIX: &str = "plasmidsaurus/ready_items";

const DEFAULT_FILE_STEM: &str = "ready_items";

const HEADER: [&str; 4] = ["item_code", "status", "done_date", "reads_url"];

/// Errors from writing the report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error writing the report.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Turns a user-supplied prefix into the CSV path.
///
/// A trailing `.csv` is dropped (it is added back), and a prefix naming a
/// directory (ending in a separator) gets `ready_items` appended.
#[must_use]
pub fn csv_path_for_prefix(prefix: &str) -> PathBuf {
    let mut prefix = prefix.strip_suffix(".csv").unwrap_or(prefix).to_string();
    if prefix.is_empty() || prefix.ends_with('/') || prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push_str(DEFAULT_FILE_STEM);
    }
    PathBuf::from(format!("{prefix}.csv"))
}

/// Writes one row per item to `path`, creating its parent directory.
///
/// Columns are `item_code,status,done_date,reads_url`; `done_date` is
/// written exactly as the API returned it. Returns the number of rows.
///
/// # Errors
///
/// Returns [`ReportError`] if the directory or file cannot be written.
pub fn write_ready_csv(path: &Path, items: &[Item], base_url: &str) -> Result<usize, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReportError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    for item in items {
        writer.write_record([
            item.code.as_str(),
            item.status.as_ref(),
            item.done_date.as_deref().unwrap_or_default(),
            reads_url(base_url, &item.code).as_str(),
        ])?;
    }

    writer.flush().map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    if items.is_empty() {
        log::info!("No items ready for download");
    } else {
        log::info!("Detected {} item(s) ready for download", items.len());
    }
    log::info!("Wrote {}", path.display());

    Ok(items.len())
}
