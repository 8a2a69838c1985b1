use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::{Error, Result};

/// Identifies the program that produced a metainfo file. Stored in the `created by` field.
pub const DEFAULT_CREATOR: &str = concat!("seedsmith/", env!("CARGO_PKG_VERSION"));

/// Value of the `creation date` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationDate {
    /// The moment `generate` runs
    #[default]
    Now,
    /// Leave the field out entirely
    Omit,
    /// A fixed UNIX timestamp (seconds)
    At(i64),
}

impl CreationDate {
    /// Resolves the date into a UNIX timestamp, if the field should be present
    pub(crate) fn resolve(self) -> Option<i64> {
        match self {
            CreationDate::Now => Some(
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_or(0, |elapsed| elapsed.as_secs() as i64),
            ),
            CreationDate::Omit => None,
            CreationDate::At(timestamp) => Some(timestamp),
        }
    }
}

impl FromStr for CreationDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "now" => Ok(CreationDate::Now),
            "none" => Ok(CreationDate::Omit),
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits
                .parse()
                .map(CreationDate::At)
                .map_err(|_| Error::InvalidCreationDate(s.to_string())),
            _ => Err(Error::InvalidCreationDate(s.to_string())),
        }
    }
}

/// Everything that shapes a generated torrent apart from its content
#[derive(Debug, Clone, Default)]
pub struct TorrentOptions {
    /// Tracker announce URLs. The first one becomes `announce`, each of them gets its own tier in `announce-list`
    pub trackers: Vec<String>,
    /// HTTP/FTP seeds (BEP-19)
    pub web_seeds: Vec<String>,
    /// Manual piece size in bytes. Picked automatically when absent
    pub piece_size: Option<u64>,
    /// BEP-27 private flag
    pub private: bool,
    pub source: Option<String>,
    pub comment: Option<String>,
    pub creation_date: CreationDate,
    /// Defaults to [`DEFAULT_CREATOR`]
    pub created_by: Option<String>,
    /// Compute a per-file MD5 sum
    pub include_md5: bool,
    /// Glob patterns matched against relative paths and their segments
    pub exclude: Vec<String>,
    /// Keep files and directories whose name starts with a dot
    pub include_hidden: bool,
    /// Add a random `entropy` field so the info-hash differs from other torrents with the same content
    pub cross_seed: bool,
}

impl TorrentOptions {
    pub(crate) fn validate_urls(&self) -> Result<()> {
        self.trackers
            .iter()
            .chain(self.web_seeds.iter())
            .try_for_each(|url| validate_url(url))
    }

    pub(crate) fn creator(&self) -> &str {
        self.created_by.as_deref().unwrap_or(DEFAULT_CREATOR)
    }
}

/// Trackers and web seeds are never contacted, but they have to be absolute URLs with a host
fn validate_url(raw: &str) -> Result<()> {
    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(Error::InvalidUrl(raw.to_string())),
    }
}
