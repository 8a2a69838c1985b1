use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// A single file that ends up in the torrent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Path relative to the content root, one element per segment.
    /// "dir1/dir2/file.ext" -> ["dir1", "dir2", "file.ext"]
    pub path: Vec<String>,
    /// Length of the file in bytes
    pub length: u64,
    source: PathBuf,
}

impl ContentEntry {
    pub fn new(path: Vec<String>, length: u64, source: PathBuf) -> Self {
        ContentEntry { path, length, source }
    }

    /// Location of the file on disk
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Single File Mode is used when the root is a file, Multi File Mode when it is a directory,
/// no matter how many files the directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    SingleFile,
    MultiFile,
}

/// Decides which walked entries are skipped
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    patterns: Vec<Pattern>,
    include_hidden: bool,
}

impl ContentFilter {
    pub fn new(patterns: &[String], include_hidden: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| Pattern::new(raw).map_err(|e| Error::InvalidPattern(raw.clone(), e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(ContentFilter {
            patterns,
            include_hidden,
        })
    }

    fn is_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    fn matches_any(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(candidate))
    }

    /// Checked for every walked directory, so excluded directories are never descended into.
    /// Hidden directories are still walked: only a file's own name makes it hidden.
    fn skips_dir(&self, name: &str) -> bool {
        self.matches_any(name)
    }

    /// Checked for every file against its whole relative path and each of its segments
    fn skips_path(&self, relative: &[String]) -> bool {
        relative.last().is_some_and(|name| self.is_hidden(name))
            || relative.iter().any(|segment| self.matches_any(segment))
            || self.matches_any(&relative.join("/"))
    }
}

/// Enumerated content of a torrent in its final order
#[derive(Debug, Clone)]
pub struct Content {
    /// File name (Single File Mode) / directory name (Multi File Mode)
    pub name: String,
    pub mode: ContentMode,
    /// Sorted by path segments, compared byte-wise. This order defines the piece layout.
    pub entries: Vec<ContentEntry>,
}

impl Content {
    #[tracing::instrument(err, skip(filter))]
    pub fn scan(root: &Path, filter: &ContentFilter) -> Result<Self> {
        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::InvalidInput(root.to_path_buf()))
            }
            Err(e) => return Err(Error::io(root, e)),
        };
        let name = root_name(root)?;

        let content = if metadata.is_file() {
            let entries = if metadata.len() > 0 {
                vec![ContentEntry::new(vec![name.clone()], metadata.len(), root.to_path_buf())]
            } else {
                Vec::new()
            };
            Content {
                name,
                mode: ContentMode::SingleFile,
                entries,
            }
        } else if metadata.is_dir() {
            Content {
                name,
                mode: ContentMode::MultiFile,
                entries: walk_directory(root, filter)?,
            }
        } else {
            return Err(Error::InvalidInput(root.to_path_buf()));
        };

        if content.entries.is_empty() {
            return Err(Error::EmptyInput(root.to_path_buf()));
        }

        tracing::debug!(
            files = content.entries.len(),
            total_length = content.total_length(),
            "finished scanning the content"
        );

        Ok(content)
    }

    pub fn total_length(&self) -> u64 {
        self.entries.iter().map(|entry| entry.length).sum()
    }
}

fn walk_directory(root: &Path, filter: &ContentFilter) -> Result<Vec<ContentEntry>> {
    // Symlinked directories are not descended into
    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        let excluded_dir = entry.file_type().is_dir() && entry_name(entry).is_some_and(|name| filter.skips_dir(name));
        entry.depth() == 0 || !excluded_dir
    });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = relative_segments(root, entry.path())?;
        if filter.skips_path(&relative) {
            tracing::trace!(path = ?entry.path(), "excluding a file");
            continue;
        }

        // Follows symlinks, so a link to a file contributes the target's contents
        let metadata = fs::metadata(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
        if !metadata.is_file() {
            tracing::trace!(path = ?entry.path(), "skipping a link to a directory");
            continue;
        }
        let length = metadata.len();
        // Empty files contribute no data to pieces
        if length == 0 {
            tracing::trace!(path = ?entry.path(), "skipping an empty file");
            continue;
        }

        entries.push(ContentEntry::new(relative, length, entry.into_path()));
    }

    entries.sort_by(|lhs, rhs| lhs.path.cmp(&rhs.path));

    Ok(entries)
}

fn entry_name(entry: &DirEntry) -> Option<&str> {
    entry.file_name().to_str()
}

fn relative_segments(root: &Path, path: &Path) -> Result<Vec<String>> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::InvalidInput(path.to_path_buf()))?;

    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .map(|segment| {
            segment
                .to_str()
                .map(str::to_owned)
                .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
        })
        .collect()
}

/// Name of the root file or directory. Paths like `.` are resolved first.
fn root_name(root: &Path) -> Result<String> {
    let name = match root.file_name() {
        Some(name) => name.to_owned(),
        None => root
            .canonicalize()
            .map_err(|e| Error::io(root, e))?
            .file_name()
            .ok_or_else(|| Error::InvalidInput(root.to_path_buf()))?
            .to_owned(),
    };

    name.into_string().map_err(|_| Error::NonUtf8Path(root.to_path_buf()))
}
