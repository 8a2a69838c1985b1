use rand::Rng;

use crate::content::{Content, ContentMode};
use crate::hasher::HashedContent;
use crate::metainfo::{File, Info, MetaInfo};
use crate::options::TorrentOptions;
use crate::piece_size::PieceSize;

const ENTROPY_BOUND: i64 = 2_000_000_000;

/// Assembles the metainfo document out of the enumerated content, its hashes and the user metadata
pub(crate) fn build_meta_info(
    content: &Content,
    piece_size: PieceSize,
    hashed: HashedContent,
    options: &TorrentOptions,
) -> MetaInfo {
    let HashedContent { pieces, md5sums } = hashed;
    let mut md5sums = md5sums.map(|sums| sums.into_iter().map(hex::encode));

    let (length, md5sum, files) = match content.mode {
        ContentMode::SingleFile => (
            Some(content.total_length()),
            md5sums.as_mut().and_then(|sums| sums.next()),
            None,
        ),
        ContentMode::MultiFile => {
            let files = content
                .entries
                .iter()
                .map(|entry| File {
                    path: entry.path.clone(),
                    length: entry.length,
                    md5sum: md5sums.as_mut().and_then(|sums| sums.next()),
                })
                .collect();
            (None, None, Some(files))
        }
    };

    let info = Info {
        name: content.name.clone(),
        pieces,
        piece_length: piece_size.get(),
        md5sum,
        length,
        files,
        // Never written as 0
        private: options.private.then_some(1),
        source: non_empty(options.source.as_deref()),
        entropy: options
            .cross_seed
            .then(|| rand::thread_rng().gen_range(-ENTROPY_BOUND..=ENTROPY_BOUND)),
    };

    let (announce, announce_list) = match options.trackers.as_slice() {
        [] => (None, None),
        [single] => (Some(single.clone()), None),
        [first, ..] => (
            Some(first.clone()),
            // BEP-12: one tier per tracker, in the order they were given
            Some(options.trackers.iter().map(|tracker| vec![tracker.clone()]).collect()),
        ),
    };

    MetaInfo {
        info,
        announce,
        announce_list,
        creation_date: options.creation_date.resolve(),
        comment: non_empty(options.comment.as_deref()),
        created_by: Some(options.creator().to_string()),
        url_list: (!options.web_seeds.is_empty()).then(|| options.web_seeds.clone()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}
