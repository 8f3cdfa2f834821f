//! Record of which items have already been downloaded.
//!
//! The default ledger treats the mere presence of `{root}/{code}` as
//! "downloaded" ([`DirectoryLedger`]). That cannot tell a finished
//! download from one that died halfway, so [`MarkerLedger`] only counts an
//! item once a `.complete` marker has been written into its directory.
//! [`MemoryLedger`] holds an injected set and never reads the filesystem.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use seqfetch_api_models::{Item, ItemCode};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Name of the marker file written by [`MarkerLedger::mark_complete`].
pub const COMPLETE_MARKER: &str = ".complete";

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// I/O error reading or writing ledger state.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Which ledger backing to use.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedgerKind {
    /// An item is downloaded iff `{root}/{code}` exists.
    #[default]
    Directory,
    /// An item is downloaded iff `{root}/{code}/.complete` exists.
    Marker,
}

/// Tracks which items are already downloaded.
pub trait Ledger: Send {
    /// Whether `code` is already downloaded and must not be fetched again.
    fn contains(&self, code: &ItemCode) -> bool;

    /// Records that a download of `code` has begun.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the state cannot be persisted.
    fn mark_started(&mut self, code: &ItemCode) -> Result<(), LedgerError>;

    /// Records that both archives of `code` were processed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the state cannot be persisted.
    fn mark_complete(&mut self, code: &ItemCode) -> Result<(), LedgerError>;
}

/// Opens the ledger of the given kind over `root`.
///
/// # Errors
///
/// Returns [`LedgerError`] if `root` exists but cannot be read.
pub fn open_ledger(kind: LedgerKind, root: &Path) -> Result<Box<dyn Ledger>, LedgerError> {
    Ok(match kind {
        LedgerKind::Directory => Box::new(DirectoryLedger::open(root)?),
        LedgerKind::Marker => Box::new(MarkerLedger::open(root)?),
    })
}

/// Keeps the items the ledger does not contain, preserving input order.
#[must_use]
pub fn select_undownloaded(items: Vec<Item>, ledger: &dyn Ledger) -> Vec<Item> {
    let total = items.len();
    let pending: Vec<Item> = items
        .into_iter()
        .filter(|item| !ledger.contains(&item.code))
        .collect();

    log::info!(
        "{} of {total} ready item(s) not yet downloaded",
        pending.len()
    );

    pending
}

/// [`select_undownloaded`] against a [`DirectoryLedger`] over `root`.
///
/// # Errors
///
/// Returns [`LedgerError`] if `root` exists but cannot be read.
pub fn select_undownloaded_in(items: Vec<Item>, root: &Path) -> Result<Vec<Item>, LedgerError> {
    let ledger = DirectoryLedger::open(root)?;
    Ok(select_undownloaded(items, &ledger))
}

/// Directory-presence ledger.
///
/// The root is scanned once at open; every immediate child name (file or
/// directory) counts as a downloaded code. Names are compared exactly,
/// case-sensitively.
pub struct DirectoryLedger {
    root: PathBuf,
    present: BTreeSet<String>,
}

impl DirectoryLedger {
    /// Scans `root`. A missing root is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if `root` exists but cannot be read.
    pub fn open(root: &Path) -> Result<Self, LedgerError> {
        let present = child_names(root)?.into_iter().collect();
        Ok(Self {
            root: root.to_path_buf(),
            present,
        })
    }
}

impl Ledger for DirectoryLedger {
    fn contains(&self, code: &ItemCode) -> bool {
        self.present.contains(code.as_str())
    }

    fn mark_started(&mut self, code: &ItemCode) -> Result<(), LedgerError> {
        create_item_dir(&self.root, code)?;
        self.present.insert(code.to_string());
        Ok(())
    }

    fn mark_complete(&mut self, _code: &ItemCode) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Completion-marker ledger.
///
/// An item counts as downloaded only once [`COMPLETE_MARKER`] exists in
/// its directory, so interrupted or failed downloads are retried.
pub struct MarkerLedger {
    root: PathBuf,
    complete: BTreeSet<String>,
}

impl MarkerLedger {
    /// Scans `root` for item directories holding a completion marker.
    /// A missing root is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if `root` exists but cannot be read.
    pub fn open(root: &Path) -> Result<Self, LedgerError> {
        let complete = child_names(root)?
            .into_iter()
            .filter(|name| root.join(name).join(COMPLETE_MARKER).is_file())
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            complete,
        })
    }
}

impl Ledger for MarkerLedger {
    fn contains(&self, code: &ItemCode) -> bool {
        self.complete.contains(code.as_str())
    }

    fn mark_started(&mut self, code: &ItemCode) -> Result<(), LedgerError> {
        create_item_dir(&self.root, code)
    }

    fn mark_complete(&mut self, code: &ItemCode) -> Result<(), LedgerError> {
        let marker = self.root.join(code.as_str()).join(COMPLETE_MARKER);
        let stamp = chrono::Utc::now().to_rfc3339();
        std::fs::write(&marker, format!("{stamp}\n")).map_err(|e| LedgerError::Io {
            path: marker.display().to_string(),
            source: e,
        })?;
        self.complete.insert(code.to_string());
        Ok(())
    }
}

/// In-memory ledger over an injected set of codes.
///
/// Behaves like [`DirectoryLedger`] (a started item counts as
/// downloaded) without touching the filesystem.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    started: BTreeSet<String>,
    complete: BTreeSet<String>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that already contains `codes`.
    #[must_use]
    pub fn with_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let started: BTreeSet<String> = codes.into_iter().map(String::from).collect();
        Self {
            complete: started.clone(),
            started,
        }
    }

    /// Whether `code` was marked complete.
    #[must_use]
    pub fn is_complete(&self, code: &ItemCode) -> bool {
        self.complete.contains(code.as_str())
    }
}

impl Ledger for MemoryLedger {
    fn contains(&self, code: &ItemCode) -> bool {
        self.started.contains(code.as_str())
    }

    fn mark_started(&mut self, code: &ItemCode) -> Result<(), LedgerError> {
        self.started.insert(code.to_string());
        Ok(())
    }

    fn mark_complete(&mut self, code: &ItemCode) -> Result<(), LedgerError> {
        self.complete.insert(code.to_string());
        Ok(())
    }
}

/// Lists the immediate child names of `root`, or nothing if it is missing.
fn child_names(root: &Path) -> Result<Vec<String>, LedgerError> {
    let io_err = |e| LedgerError::Io {
        path: root.display().to_string(),
        source: e,
    };

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

fn create_item_dir(root: &Path, code: &ItemCode) -> Result<(), LedgerError> {
    let dir = root.join(code.as_str());
    std::fs::create_dir_all(&dir).map_err(|e| LedgerError::Io {
        path: dir.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use seqfetch_api_models::{ItemStatus, ProductName};

    use super::*;

    fn code(s: &str) -> ItemCode {
        s.parse().unwrap()
    }

    fn item(c: &str) -> Item {
        Item {
            code: code(c),
            done_date: Some("2024-09-02T00:00:00+00:00".to_string()),
            gross: 15.0,
            product_name: ProductName::PlasmidHighCopy,
            quantity: 1,
            status: ItemStatus::Complete,
        }
    }

    fn codes(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.code.as_str()).collect()
    }

    fn fresh_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    #[test]
    fn existing_directory_excludes_item() {
        let root = fresh_dir("seqfetch_ledger_existing");
        fs::create_dir_all(root.join("AAA111")).unwrap();

        let pending = select_undownloaded_in(vec![item("AAA111"), item("BBB222")], &root).unwrap();
        assert_eq!(codes(&pending), vec!["BBB222"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn selection_is_idempotent() {
        let root = fresh_dir("seqfetch_ledger_idempotent");
        fs::create_dir_all(root.join("BBB222")).unwrap();
        let items = vec![item("AAA111"), item("BBB222"), item("CCC333")];

        let first = select_undownloaded_in(items.clone(), &root).unwrap();
        let second = select_undownloaded_in(items, &root).unwrap();
        assert_eq!(first, second);
        assert_eq!(codes(&first), vec!["AAA111", "CCC333"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn names_are_case_sensitive() {
        let root = fresh_dir("seqfetch_ledger_case");
        fs::create_dir_all(root.join("aaa111")).unwrap();

        let ledger = DirectoryLedger::open(&root).unwrap();
        assert!(!ledger.contains(&code("AAA111")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn plain_files_count_as_downloaded() {
        let root = fresh_dir("seqfetch_ledger_files");
        fs::write(root.join("AAA111"), b"").unwrap();

        let ledger = DirectoryLedger::open(&root).unwrap();
        assert!(ledger.contains(&code("AAA111")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_root_is_empty() {
        let root = std::env::temp_dir().join("seqfetch_ledger_missing_root");
        let _ = fs::remove_dir_all(&root);

        let pending = select_undownloaded_in(vec![item("AAA111")], &root).unwrap();
        assert_eq!(codes(&pending), vec!["AAA111"]);
    }

    #[test]
    fn directory_ledger_counts_started_items() {
        let root = fresh_dir("seqfetch_ledger_started");

        let mut ledger = DirectoryLedger::open(&root).unwrap();
        ledger.mark_started(&code("AAA111")).unwrap();
        assert!(ledger.contains(&code("AAA111")));
        assert!(root.join("AAA111").is_dir());

        let reopened = DirectoryLedger::open(&root).unwrap();
        assert!(reopened.contains(&code("AAA111")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn marker_ledger_retries_unfinished_items() {
        let root = fresh_dir("seqfetch_ledger_marker");

        let mut ledger = MarkerLedger::open(&root).unwrap();
        ledger.mark_started(&code("AAA111")).unwrap();
        ledger.mark_started(&code("BBB222")).unwrap();
        ledger.mark_complete(&code("BBB222")).unwrap();
        assert!(!ledger.contains(&code("AAA111")));
        assert!(ledger.contains(&code("BBB222")));

        let reopened = MarkerLedger::open(&root).unwrap();
        let pending = select_undownloaded(vec![item("AAA111"), item("BBB222")], &reopened);
        assert_eq!(codes(&pending), vec!["AAA111"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn memory_ledger_uses_injected_codes() {
        let ledger = MemoryLedger::with_codes(["AAA111"]);
        let pending = select_undownloaded(vec![item("AAA111"), item("BBB222")], &ledger);
        assert_eq!(codes(&pending), vec!["BBB222"]);
    }

    #[test]
    fn open_ledger_by_kind() {
        let root = fresh_dir("seqfetch_ledger_kind");
        fs::create_dir_all(root.join("AAA111")).unwrap();

        let by_dir = open_ledger(LedgerKind::Directory, &root).unwrap();
        let by_marker = open_ledger(LedgerKind::Marker, &root).unwrap();
        assert!(by_dir.contains(&code("AAA111")));
        assert!(!by_marker.contains(&code("AAA111")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn parses_ledger_kind() {
        assert_eq!("marker".parse::<LedgerKind>().unwrap(), LedgerKind::Marker);
        assert_eq!(LedgerKind::default().to_string(), "directory");
        assert!("sqlite".parse::<LedgerKind>().is_err());
    }
}
