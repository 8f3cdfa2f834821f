#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data types for the sequencing results API.
//!
//! Every response from the vendor API deserializes into one of the types
//! here. An [`Item`] is a purchased (or shared) sequencing order keyed by
//! its six-character [`ItemCode`]; the code is also the name of the local
//! directory its results are downloaded into, so it is validated on the
//! way in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Length of every item code.
pub const ITEM_CODE_LEN: usize = 6;

/// Returned when a string is not a valid [`ItemCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid item code {code:?}: expected {ITEM_CODE_LEN} uppercase letters or digits")]
pub struct InvalidItemCode {
    /// The rejected input.
    pub code: String,
}

/// Unique identifier of an item, matching `^[A-Z0-9]{6}$`.
///
/// Codes are the sole join key between catalog entries and local storage,
/// and are used verbatim as directory names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemCode(String);

impl ItemCode {
    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemCode {
    type Error = InvalidItemCode;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        let valid = code.len() == ITEM_CODE_LEN
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());

        if valid {
            Ok(Self(code))
        } else {
            Err(InvalidItemCode { code })
        }
    }
}

impl FromStr for ItemCode {
    type Err = InvalidItemCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<ItemCode> for String {
    fn from(code: ItemCode) -> Self {
        code.0
    }
}

impl AsRef<str> for ItemCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status of an item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemStatus {
    /// Order placed, samples not yet received.
    Submitted,
    /// Samples received, waiting in queue.
    Pending,
    /// Sequencing or analysis in progress.
    Processing,
    /// Results are available.
    Complete,
    /// A status this client does not know about yet.
    #[serde(other)]
    Unknown,
}

/// Product an item was ordered as.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductName {
    PlasmidHighCopy,
    PlasmidLowCopy,
    PlasmidBig,
    PlasmidHuge,
    PcrPurified,
    PcrUnpurified,
    LinearBig,
    PcrPremium,
    PcrPremiumBig,
    PcrPremiumHuge,
    ZeroPrep,
    Rca,
    Bacteria,
    BacteriaBig,
    BacteriaExtraction,
    BacteriaBigExtraction,
    Hybrid,
    HybridBig,
    HybridExtraction,
    HybridBigExtraction,
    Yeast,
    YeastExtraction,
    YeastHybrid,
    AavSingleStranded,
    AavSelfComplementary,
    /// Custom sequencing projects. These have reads but no results archive.
    Custom,
    /// A product this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl ProductName {
    /// Whether the vendor produces a results archive for this product.
    #[must_use]
    pub const fn has_results(self) -> bool {
        !matches!(self, Self::Custom)
    }
}

/// A purchased or shared sequencing order.
///
/// Snapshots are fetched fresh on every run and never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item code.
    pub code: ItemCode,
    /// Completion timestamp exactly as returned by the API (ISO 8601,
    /// UTC). `None` until the item completes.
    pub done_date: Option<String>,
    /// Total cost of the item in USD.
    pub gross: f64,
    /// Product the item was ordered as.
    pub product_name: ProductName,
    /// Number of samples in the item.
    pub quantity: u32,
    /// Processing status.
    pub status: ItemStatus,
}

impl Item {
    /// Parses [`Item::done_date`] into an instant.
    ///
    /// Returns `None` when the date is missing or unparseable.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.done_date.as_deref().and_then(parse_done_date)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == ItemStatus::Complete
    }
}

/// Parses an API completion timestamp.
///
/// Accepts RFC 3339 with any offset (normalized to UTC). Timestamps
/// without an offset are taken to be UTC, which is what the API documents.
#[must_use]
pub fn parse_done_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

/// Assembly statistics for one contig of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    /// Mean read coverage.
    pub coverage: f64,
    /// Contig length in base pairs.
    pub length: u64,
    /// Reads that mapped to the contig.
    pub n_reads: u64,
}

/// A single sample within an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Assemblies produced for this sample (may be empty).
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
    /// Sample name as submitted.
    pub name: String,
    /// Processing status of the sample.
    pub status: ItemStatus,
}

/// A downloadable archive attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Artifact {
    /// Assembly output (fasta, gbk, reports).
    Results,
    /// Raw sequencing reads (fastq).
    Reads,
}

impl Artifact {
    /// Both artifacts, in the order they are downloaded.
    pub const ALL: [Self; 2] = [Self::Results, Self::Reads];

    /// Name of the directory the archive is extracted into, e.g.
    /// `ABC123_results`.
    #[must_use]
    pub fn dir_name(self, code: &ItemCode) -> String {
        format!("{code}_{}", self.as_ref())
    }

    /// File name of the staged archive, e.g. `ABC123_reads.zip`.
    #[must_use]
    pub fn archive_name(self, code: &ItemCode) -> String {
        format!("{}.zip", self.dir_name(code))
    }
}

/// Body of a successful `/results` or `/reads` lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadLink {
    /// Pre-signed URL of the archive.
    pub link: String,
}

/// Opaque bearer token, valid for the duration of one run.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
