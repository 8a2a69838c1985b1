use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha1::{Digest, Sha1};

use crate::info_hash::InfoHash;
use crate::{Error, Result};

/// Multiple File Mode info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// A list containing one or more string elements that together represent the path and filename.
    /// Each element in the list corresponds to either a directory name or the filename.
    /// "dir1/dir2/file.ext" -> ["dir1", "dir2", "file.ext"]
    pub path: Vec<String>,
    /// Length of the file in bytes
    pub length: u64,
    /// MD5 sum of the file, hex-encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Filename (Single File Mode) / Name of the directory (Multi File Mode)
    pub name: String,
    /// Concatenated piece hashes (20-byte SHA1 hash values). Must be a multiple of 20
    #[serde_as(as = "Bytes")]
    pub pieces: Vec<u8>,
    /// Number of bytes in each piece
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    /// MD5 sum of the file (Single File Mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
    /// Length of the file in bytes (Single File Mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// A list of Files (Multi File Mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<File>>,
    /// External peer source. Only ever written as 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<u8>,
    /// Origin tag used by private trackers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Random value that makes the info-hash unique for cross-seeding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy: Option<i64>,
}

impl Info {
    /// SHA1 Hash of bencoded self
    pub fn hash(&self) -> Result<InfoHash> {
        let serialized_struct = serde_bencode::to_bytes(self).map_err(Error::Encoding)?;
        let hasher = Sha1::new_with_prefix(serialized_struct);
        Ok(InfoHash::new(hasher.finalize().into()))
    }

    /// Sum of all file lengths
    pub fn total_length(&self) -> u64 {
        match self.files.as_ref() {
            Some(files) => files.iter().map(|file| file.length).sum(),
            None => self.length.unwrap_or(0),
        }
    }

    pub fn number_of_pieces(&self) -> usize {
        self.pieces.len() / crate::hasher::PIECE_HASH_LENGTH
    }

    /// Iterates over the 20-byte piece hashes
    pub fn piece_hashes(&self) -> impl Iterator<Item = &[u8]> {
        self.pieces.chunks_exact(crate::hasher::PIECE_HASH_LENGTH)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    /// Description of the file(s) of the torrent
    pub info: Info,
    /// The announce URL of the tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<String>,
    /// Tiers of announce URLs (BEP-12)
    #[serde(default, rename = "announce-list", skip_serializing_if = "Option::is_none")]
    pub announce_list: Option<Vec<Vec<String>>>,
    /// The creation time of the torrent (UNIX epoch format)
    #[serde(default, rename = "creation date", skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    /// Free-form comments of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name and version of the program used to create the Metainfo file
    #[serde(default, rename = "created by", skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Web seeds (BEP-19)
    #[serde(default, rename = "url-list", skip_serializing_if = "Option::is_none")]
    pub url_list: Option<Vec<String>>,
}

impl MetaInfo {
    /// Parses a canonical bencoded metainfo file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_bencode::from_bytes(bytes)?)
    }

    /// Canonical bencoding of the whole document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_bencode::to_bytes(self).map_err(Error::Encoding)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_bencode::to_writer(self, writer).map_err(Error::Encoding)
    }

    pub fn info_hash(&self) -> Result<InfoHash> {
        self.info.hash()
    }
}
