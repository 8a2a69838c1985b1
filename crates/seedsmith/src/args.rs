use std::path::PathBuf;

use clap::{ArgAction, Parser};
use seedsmith_lib::{CreationDate, TorrentOptions};

use crate::size::parse_size;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Arguments {
    /// File or directory to create a torrent from
    #[arg(value_name = "PATH")]
    pub input: PathBuf,
    /// Where to save the torrent. Defaults to `<name>.torrent` in the current directory, existing directories
    /// get it inside them. Single files drop their extension, directory names are kept whole
    /// (`my.album` -> `my.album.torrent`)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
    /// Tracker announce URL. The first one is the primary tracker
    #[arg(short, long = "tracker", value_name = "URL")]
    pub trackers: Vec<String>,
    /// Web seed URL (BEP-19)
    #[arg(short, long = "web-seed", value_name = "URL")]
    pub web_seeds: Vec<String>,
    /// Piece size, e.g. 16K, 4MiB. Picked automatically by default
    #[arg(short = 's', long, value_name = "SIZE", value_parser = parse_size)]
    pub piece_size: Option<u64>,
    /// Mark the torrent as private (BEP-27)
    #[arg(short, long)]
    pub private: bool,
    /// Source tag, used by private trackers
    #[arg(long)]
    pub source: Option<String>,
    /// Glob pattern of files to leave out
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,
    #[arg(short, long)]
    pub comment: Option<String>,
    /// Creation date: `now`, `none` or a unix timestamp
    #[arg(short = 'd', long = "date", value_name = "DATE", default_value = "now")]
    pub creation_date: CreationDate,
    /// Store an MD5 sum of every file
    #[arg(long)]
    pub md5: bool,
    /// Include files and directories whose name starts with a dot
    #[arg(long)]
    pub include_hidden: bool,
    /// Make the info-hash unique so the torrent can be cross-seeded
    #[arg(long)]
    pub cross_seed: bool,
    /// More logs. Can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Arguments {
    pub fn torrent_options(&self) -> TorrentOptions {
        TorrentOptions {
            trackers: self.trackers.clone(),
            web_seeds: self.web_seeds.clone(),
            piece_size: self.piece_size,
            private: self.private,
            source: self.source.clone(),
            comment: self.comment.clone(),
            creation_date: self.creation_date,
            created_by: None,
            include_md5: self.md5,
            exclude: self.exclude.clone(),
            include_hidden: self.include_hidden,
            cross_seed: self.cross_seed,
        }
    }
}
