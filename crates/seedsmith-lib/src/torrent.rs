use std::io::Write;
use std::path::{Path, PathBuf};

use crate::builder::build_meta_info;
use crate::cancellation::CancellationToken;
use crate::content::{Content, ContentFilter};
use crate::hasher::{ContentReader, FsReader, PieceHasher, Progress};
use crate::info_hash::InfoHash;
use crate::metainfo::MetaInfo;
use crate::options::TorrentOptions;
use crate::piece_size::PieceSize;
use crate::{Error, Result};

/// Everything known about the content before hashing starts
#[derive(Debug, Clone)]
pub struct ContentPlan {
    pub content: Content,
    pub piece_size: PieceSize,
}

impl ContentPlan {
    pub fn total_length(&self) -> u64 {
        self.content.total_length()
    }

    pub fn file_count(&self) -> usize {
        self.content.entries.len()
    }

    pub fn piece_count(&self) -> u64 {
        self.piece_size.piece_count(self.total_length())
    }
}

/// A torrent under construction.
///
/// All options are validated by [`Torrent::new`]. The metainfo only exists after a successful
/// [`Torrent::generate`] and stays untouched until the next one.
#[derive(Debug)]
pub struct Torrent {
    root: PathBuf,
    options: TorrentOptions,
    manual_piece_size: Option<PieceSize>,
    filter: ContentFilter,
    meta_info: Option<MetaInfo>,
}

impl Torrent {
    /// Fails on invalid URLs, piece sizes and exclusion patterns. Doesn't touch the filesystem.
    pub fn new(root: impl Into<PathBuf>, options: TorrentOptions) -> Result<Self> {
        let manual_piece_size = options.piece_size.map(PieceSize::new).transpose()?;
        options.validate_urls()?;
        let filter = ContentFilter::new(&options.exclude, options.include_hidden)?;

        Ok(Torrent {
            root: root.into(),
            options,
            manual_piece_size,
            filter,
            meta_info: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &TorrentOptions {
        &self.options
    }

    /// Enumerates the content and picks the piece size without reading any file contents
    pub fn plan(&self) -> Result<ContentPlan> {
        let content = Content::scan(&self.root, &self.filter)?;
        let piece_size = PieceSize::select(content.total_length(), self.manual_piece_size);
        tracing::debug!(
            name = %content.name,
            files = content.entries.len(),
            %piece_size,
            "planned the torrent"
        );

        Ok(ContentPlan { content, piece_size })
    }

    /// Scans and hashes the content from disk. The previous metainfo is dropped even if scanning fails.
    pub fn generate<F>(&mut self, cancellation: &CancellationToken, progress: F) -> Result<&MetaInfo>
    where
        F: FnMut(&Progress<'_>) -> anyhow::Result<()>,
    {
        self.meta_info = None;
        let plan = self.plan()?;
        self.generate_from_plan(plan, &FsReader, cancellation, progress)
    }

    /// Hashes an already enumerated plan, reading entries through `reader`.
    /// The previous metainfo (if any) is dropped first, so a failure never leaves stale output behind.
    #[tracing::instrument(skip_all, fields(root = ?self.root))]
    pub fn generate_from_plan<R, F>(
        &mut self,
        plan: ContentPlan,
        reader: &R,
        cancellation: &CancellationToken,
        progress: F,
    ) -> Result<&MetaInfo>
    where
        R: ContentReader,
        F: FnMut(&Progress<'_>) -> anyhow::Result<()>,
    {
        self.meta_info = None;

        let hashed = PieceHasher::new(
            reader,
            plan.piece_size,
            self.options.include_md5,
            cancellation,
            progress,
        )
        .hash(&plan.content.entries)?;

        let meta_info = build_meta_info(&plan.content, plan.piece_size, hashed, &self.options);
        Ok(self.meta_info.insert(meta_info))
    }

    pub fn meta_info(&self) -> Result<&MetaInfo> {
        self.meta_info.as_ref().ok_or(Error::NotGenerated)
    }

    pub fn into_meta_info(self) -> Result<MetaInfo> {
        self.meta_info.ok_or(Error::NotGenerated)
    }

    pub fn info_hash(&self) -> Result<InfoHash> {
        self.meta_info()?.info_hash()
    }

    /// Bencoded metainfo. Can be called any number of times without rehashing.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.meta_info()?.to_bytes()
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.meta_info()?.write_to(writer)
    }

    pub fn magnet_link(&self) -> Result<String> {
        let meta_info = self.meta_info()?;
        let info_hash = meta_info.info_hash()?;
        Ok(info_hash.magnet_link(&meta_info.info.name, self.options.trackers.iter().map(String::as_str)))
    }
}
