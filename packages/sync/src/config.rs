//! Run configuration: defaults, optional TOML file, and overrides.
//!
//! Precedence is command-line flag, then config file, then the defaults
//! below.
//!
//! ```toml
//! data_dir = "/srv/sequencing"
//! max_per_run = 5
//! download_after = "2024-09-01T00:00:00Z"
//! keep_archives = false
//! ledger = "marker"
//! api_url = "https://plasmidsaurus.com"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use seqfetch_api_models::parse_done_date;
use serde::Deserialize;

use crate::ledger::LedgerKind;

/// Default download root.
pub const DEFAULT_DATA_DIR: &str = "./plasmidsaurus_data";

/// Default cap on items fetched per invocation. Keeps a cron-driven run
/// under the API's rate limits; the rest are picked up next time.
pub const DEFAULT_MAX_PER_RUN: usize = 3;

/// Midnight UTC on 2024-09-01. Checked at compile time.
const DEFAULT_CUTOFF: NaiveDateTime = match NaiveDate::from_ymd_opt(2024, 9, 1) {
    Some(date) => date.and_time(NaiveTime::MIN),
    None => panic!("default cutoff is not a valid date"),
};

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ConfigFile`].
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Cutoff is neither RFC 3339 nor `YYYY-MM-DD`.
    #[error("Invalid cutoff {value:?}: expected RFC 3339 or YYYY-MM-DD")]
    InvalidCutoff {
        /// The rejected value.
        value: String,
    },
}

/// Contents of an optional TOML config file. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub max_per_run: Option<usize>,
    /// Cutoff as a string; see [`parse_cutoff`].
    pub download_after: Option<String>,
    pub keep_archives: Option<bool>,
    pub ledger: Option<LedgerKind>,
    pub api_url: Option<String>,
}

impl ConfigFile {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Settings for one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Directory holding one subdirectory per downloaded item.
    pub destination_root: PathBuf,
    /// Maximum items fetched per invocation.
    pub max_per_run: usize,
    /// Completed items at or before this instant are ignored.
    pub cutoff: DateTime<Utc>,
    /// Keep the downloaded `.zip` files after extraction.
    pub keep_archives: bool,
    pub ledger: LedgerKind,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from(DEFAULT_DATA_DIR),
            max_per_run: DEFAULT_MAX_PER_RUN,
            cutoff: default_cutoff(),
            keep_archives: false,
            ledger: LedgerKind::Directory,
        }
    }
}

impl RunConfiguration {
    /// Defaults overlaid with the values present in `file`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCutoff`] if `download_after` is
    /// malformed.
    pub fn from_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = &file.data_dir {
            config.destination_root.clone_from(dir);
        }
        if let Some(max) = file.max_per_run {
            config.max_per_run = max;
        }
        if let Some(after) = &file.download_after {
            config.cutoff = parse_cutoff(after)?;
        }
        if let Some(keep) = file.keep_archives {
            config.keep_archives = keep;
        }
        if let Some(ledger) = file.ledger {
            config.ledger = ledger;
        }

        Ok(config)
    }
}

/// The default cutoff, 2024-09-01T00:00:00Z.
#[must_use]
pub fn default_cutoff() -> DateTime<Utc> {
    DEFAULT_CUTOFF.and_utc()
}

/// Parses a cutoff given as RFC 3339 or as a bare `YYYY-MM-DD` date
/// (midnight UTC).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidCutoff`] if neither form matches.
pub fn parse_cutoff(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();
    if let Some(dt) = parse_done_date(value) {
        return Ok(dt);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConfigError::InvalidCutoff {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_is_first_of_september_2024() {
        assert_eq!(default_cutoff().to_rfc3339(), "2024-09-01T00:00:00+00:00");
        assert_eq!(default_cutoff().timestamp(), 1_725_148_800);
    }

    #[test]
    fn default_cutoff_matches_bare_date_cutoff() {
        assert_eq!(parse_cutoff("2024-09-01").unwrap(), default_cutoff());
    }

    #[test]
    fn defaults() {
        let config = RunConfiguration::default();
        assert_eq!(config.destination_root, PathBuf::from("./plasmidsaurus_data"));
        assert_eq!(config.max_per_run, 3);
        assert_eq!(config.ledger, LedgerKind::Directory);
        assert!(!config.keep_archives);
    }

    #[test]
    fn parses_cutoff_forms() {
        assert_eq!(
            parse_cutoff("2024-10-01").unwrap().to_rfc3339(),
            "2024-10-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_cutoff("2024-10-01T12:00:00+02:00").unwrap().to_rfc3339(),
            "2024-10-01T10:00:00+00:00"
        );
        assert!(matches!(
            parse_cutoff("last tuesday"),
            Err(ConfigError::InvalidCutoff { .. })
        ));
    }

    #[test]
    fn file_values_override_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            data_dir = "/srv/seq"
            max_per_run = 10
            download_after = "2025-01-01T00:00:00Z"
            ledger = "marker"
            "#,
        )
        .unwrap();

        let config = RunConfiguration::from_file(&file).unwrap();
        assert_eq!(config.destination_root, PathBuf::from("/srv/seq"));
        assert_eq!(config.max_per_run, 10);
        assert_eq!(config.cutoff.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(config.ledger, LedgerKind::Marker);
        assert!(!config.keep_archives);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<ConfigFile>("max_downloads = 4").is_err());
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join("seqfetch_config_load.toml");
        std::fs::write(&path, "keep_archives = true\napi_url = \"http://localhost:8080\"\n")
            .unwrap();

        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.keep_archives, Some(true));
        assert_eq!(file.api_url.as_deref(), Some("http://localhost:8080"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("seqfetch_config_missing.toml");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            ConfigFile::load(&path),
            Err(ConfigError::Io { .. })
        ));
    }
}
