use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::cancellation::CancellationToken;
use crate::content::ContentEntry;
use crate::piece_size::PieceSize;
use crate::{Error, Result};

/// Upper bound for a single read. Cancellation is checked before each read.
pub const READ_CHUNK_SIZE: u64 = 1 << 20;
pub const PIECE_HASH_LENGTH: usize = 20;

/// Opens enumerated entries for sequential reading
pub trait ContentReader {
    type Reader: Read;

    fn open(&self, entry: &ContentEntry) -> io::Result<Self::Reader>;
}

/// Reads entries straight from the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ContentReader for FsReader {
    type Reader = File;

    fn open(&self, entry: &ContentEntry) -> io::Result<File> {
        File::open(entry.source())
    }
}

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// The entry that is being read
    pub path: &'a Path,
    pub bytes_hashed: u64,
    pub total_bytes: u64,
    pub pieces_hashed: u64,
    pub total_pieces: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedContent {
    /// Concatenated 20-byte SHA1 piece hashes, in piece order
    pub pieces: Vec<u8>,
    /// One MD5 sum per entry, in entry order. Only present if requested.
    pub md5sums: Option<Vec<[u8; 16]>>,
}

impl HashedContent {
    pub fn number_of_pieces(&self) -> usize {
        self.pieces.len() / PIECE_HASH_LENGTH
    }
}

/// Hashes a list of entries as one contiguous stream, cut into `piece_size` windows.
/// Pieces span file boundaries and only the last one may be shorter.
pub struct PieceHasher<'a, R, F> {
    reader: &'a R,
    piece_size: PieceSize,
    include_md5: bool,
    cancellation: &'a CancellationToken,
    progress: F,
}

impl<'a, R, F> PieceHasher<'a, R, F>
where
    R: ContentReader,
    F: FnMut(&Progress<'_>) -> anyhow::Result<()>,
{
    pub fn new(
        reader: &'a R,
        piece_size: PieceSize,
        include_md5: bool,
        cancellation: &'a CancellationToken,
        progress: F,
    ) -> Self {
        PieceHasher {
            reader,
            piece_size,
            include_md5,
            cancellation,
            progress,
        }
    }

    #[tracing::instrument(err, skip_all, fields(piece_size = %self.piece_size, files = entries.len()))]
    pub fn hash(&mut self, entries: &[ContentEntry]) -> Result<HashedContent> {
        let piece_size = self.piece_size.get();
        let total_bytes: u64 = entries.iter().map(|entry| entry.length).sum();
        let total_pieces = self.piece_size.piece_count(total_bytes);

        let mut pieces = Vec::with_capacity(usize::try_from(total_pieces).unwrap_or(0) * PIECE_HASH_LENGTH);
        let mut md5sums: Option<Vec<[u8; 16]>> = self.include_md5.then(|| Vec::with_capacity(entries.len()));

        // Never holds more than one piece worth of bytes
        let mut buffer = vec![0; piece_size.min(READ_CHUNK_SIZE) as usize];
        let mut piece_hasher = Sha1::new();
        let mut piece_filled = 0u64;
        let mut bytes_hashed = 0u64;
        let mut pieces_hashed = 0u64;

        for entry in entries {
            self.check_cancelled()?;
            tracing::trace!(path = ?entry.source(), length = entry.length, "hashing a file");

            let mut reader = self
                .reader
                .open(entry)
                .map_err(|e| Error::io(entry.source(), e))?;
            let mut file_hasher = self.include_md5.then(Md5::new);

            let mut remaining = entry.length;
            while remaining > 0 {
                self.check_cancelled()?;

                // Never read past the end of the current piece
                let to_read = remaining.min(piece_size - piece_filled).min(READ_CHUNK_SIZE) as usize;
                let read = match reader.read(&mut buffer[..to_read]) {
                    Ok(0) => {
                        return Err(Error::io(
                            entry.source(),
                            io::Error::new(io::ErrorKind::UnexpectedEof, "file is shorter than when it was scanned"),
                        ))
                    }
                    Ok(read) => read,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(Error::io(entry.source(), e)),
                };

                let chunk = &buffer[..read];
                piece_hasher.update(chunk);
                if let Some(file_hasher) = file_hasher.as_mut() {
                    file_hasher.update(chunk);
                }

                let read = read as u64;
                remaining -= read;
                piece_filled += read;
                bytes_hashed += read;

                if piece_filled == piece_size {
                    pieces.extend_from_slice(&piece_hasher.finalize_reset());
                    piece_filled = 0;
                    pieces_hashed += 1;
                    self.report(Progress {
                        path: entry.source(),
                        bytes_hashed,
                        total_bytes,
                        pieces_hashed,
                        total_pieces,
                    });
                }
            }

            if let (Some(md5sums), Some(file_hasher)) = (md5sums.as_mut(), file_hasher) {
                md5sums.push(file_hasher.finalize().into());
            }

            // A piece that finished exactly at the end of the file was reported already
            if piece_filled != 0 {
                self.report(Progress {
                    path: entry.source(),
                    bytes_hashed,
                    total_bytes,
                    pieces_hashed,
                    total_pieces,
                });
            }
        }

        // The tail of the stream makes up the last, shorter piece
        if piece_filled != 0 {
            pieces.extend_from_slice(&piece_hasher.finalize());
            pieces_hashed += 1;
            if let Some(last) = entries.last() {
                self.report(Progress {
                    path: last.source(),
                    bytes_hashed,
                    total_bytes,
                    pieces_hashed,
                    total_pieces,
                });
            }
        }

        tracing::debug!(pieces = pieces_hashed, bytes = bytes_hashed, "finished hashing");

        Ok(HashedContent { pieces, md5sums })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            tracing::debug!("hashing was cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Progress reporting is best-effort: a failing callback doesn't affect hashing
    fn report(&mut self, progress: Progress<'_>) {
        if let Err(e) = (self.progress)(&progress) {
            tracing::warn!("progress callback failed: {:#}", e);
        }
    }
}
