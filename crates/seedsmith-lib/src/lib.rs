mod builder;
mod cancellation;
mod content;
mod error;
mod hasher;
mod info_hash;
mod metainfo;
mod options;
mod piece_size;
mod torrent;

pub use cancellation::CancellationToken;
pub use content::{Content, ContentEntry, ContentFilter, ContentMode};
pub use error::{Error, Result};
pub use hasher::{ContentReader, FsReader, HashedContent, PieceHasher, Progress, PIECE_HASH_LENGTH, READ_CHUNK_SIZE};
pub use info_hash::InfoHash;
pub use metainfo::{File, Info, MetaInfo};
pub use options::{CreationDate, TorrentOptions, DEFAULT_CREATOR};
pub use piece_size::{PieceSize, MAX_PIECE_SIZE, MIN_PIECE_SIZE, TARGET_PIECE_COUNT};
pub use torrent::{ContentPlan, Torrent};
