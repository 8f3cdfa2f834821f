//! Zip extraction for downloaded results and reads archives.

use std::path::{Path, PathBuf};

/// Errors from archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Archive file not found.
    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),

    /// The archive is not a readable zip file.
    #[error("Invalid zip archive {path}: {source}")]
    Zip {
        /// Archive path.
        path: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// I/O error during extraction.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Extracts a zip archive into `dest_dir`, returning the number of
/// entries in the archive.
///
/// The target directory is created if it does not exist. Existing
/// contents are not removed; the archive is extracted on top. Entries
/// whose paths would escape `dest_dir` are rejected by the zip reader.
///
/// # Errors
///
/// Returns an error if the archive is missing, corrupt, or cannot be
/// written out.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<u64, ArchiveError> {
    if !archive_path.exists() {
        return Err(ArchiveError::ArchiveNotFound(
            archive_path.display().to_string(),
        ));
    }

    log::info!(
        "Unzipping {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    std::fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    let file = std::fs::File::open(archive_path).map_err(|e| ArchiveError::Io {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let zip_err = |e| ArchiveError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    };

    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;
    let count = archive.len() as u64;
    archive.extract(dest_dir).map_err(zip_err)?;

    log::info!("  extracted {count} entries");

    Ok(count)
}

/// Runs [`extract_zip`] on the blocking thread pool.
///
/// # Errors
///
/// Returns the extraction error, or [`ArchiveError::Io`] if the blocking
/// task panicked.
pub async fn extract_zip_blocking(
    archive_path: PathBuf,
    dest_dir: PathBuf,
) -> Result<u64, ArchiveError> {
    let path = archive_path.display().to_string();
    tokio::task::spawn_blocking(move || extract_zip(&archive_path, &dest_dir))
        .await
        .map_err(|e| ArchiveError::Io {
            path,
            source: std::io::Error::other(e),
        })?
}
