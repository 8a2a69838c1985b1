use std::path::PathBuf;
use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input path is invalid: {0:?}")]
    InvalidInput(PathBuf),
    #[error("input path must contain at least one non-empty file: {0:?}")]
    EmptyInput(PathBuf),
    #[error("invalid piece size {0}: {1}")]
    InvalidPieceSize(u64, &'static str),
    #[error("{0} is not a valid URL")]
    InvalidUrl(String),
    #[error("invalid exclusion pattern {0:?}: {1}")]
    InvalidPattern(String, #[source] glob::PatternError),
    #[error("invalid creation date {0:?}: expected a unix timestamp, \"now\" or \"none\"")]
    InvalidCreationDate(String),
    #[error("path is not valid unicode: {0:?}")]
    NonUtf8Path(PathBuf),
    #[error("error while reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("torrent generation was cancelled")]
    Cancelled,
    #[error("torrent not generated - call generate() first")]
    NotGenerated,
    #[error("error while encoding the metainfo: {0}")]
    Encoding(#[source] serde_bencode::Error),
    #[error("error while parsing bencoded metainfo: {0}")]
    MalformedBencode(#[from] serde_bencode::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
