mod args;
mod logging;
mod size;
mod stats;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use seedsmith_lib::{CancellationToken, ContentMode, ContentPlan, FsReader, Progress, Torrent};
use tokio::sync::mpsc;

use crate::args::Arguments;
use crate::stats::StatsEntry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    logging::setup_logger(args.verbose)?;

    run(args).await
}

#[tracing::instrument(err, skip_all)]
async fn run(args: Arguments) -> anyhow::Result<()> {
    let mut torrent = Torrent::new(&args.input, args.torrent_options()).context("invalid torrent options")?;

    let plan = torrent.plan().context("failed to enumerate the content")?;
    tracing::info!(
        "{}: {} file(s), {} bytes, {} pieces of {} bytes",
        plan.content.name,
        plan.file_count(),
        plan.total_length(),
        plan.piece_count(),
        plan.piece_size
    );
    let base_name = match plan.content.mode {
        ContentMode::SingleFile => file_stem(&plan.content.name),
        ContentMode::MultiFile => plan.content.name.as_str(),
    };
    let output = output_path(args.output.as_deref(), base_name);

    let cancellation = CancellationToken::new();
    let (stats_tx, stats_rx) = mpsc::unbounded_channel();
    let stats_task = tokio::spawn(stats::stats(plan.total_length(), stats_rx));

    let mut hashing = tokio::task::spawn_blocking({
        let cancellation = cancellation.clone();
        move || hash(&mut torrent, plan, &cancellation, stats_tx).map(|()| torrent)
    });

    let hashed = tokio::select! {
        result = &mut hashing => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::warn!("interrupted, stopping");
            cancellation.cancel();
            hashing.await
        }
    };
    let torrent = hashed.context("hashing task panicked")?.context("failed to hash the content")?;

    stats_task.await.context("stats task")??;

    let encoded = torrent.to_bytes().context("failed to encode the torrent")?;
    tokio::fs::write(&output, encoded)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    let info_hash = torrent.info_hash().context("failed to compute the info-hash")?;
    tracing::info!("info-hash: {}", info_hash);
    tracing::info!("magnet: {}", torrent.magnet_link().context("failed to build a magnet link")?);
    tracing::info!("saved to {}", output.display());

    Ok(())
}

/// Runs on a blocking thread. Progress is forwarded to the stats task.
fn hash(
    torrent: &mut Torrent,
    plan: ContentPlan,
    cancellation: &CancellationToken,
    stats_tx: mpsc::UnboundedSender<StatsEntry>,
) -> seedsmith_lib::Result<()> {
    let mut reported = 0;
    let started = Instant::now();

    torrent.generate_from_plan(plan, &FsReader, cancellation, |progress: &Progress<'_>| {
        let entry = StatsEntry::new(
            Instant::now(),
            progress.bytes_hashed - reported,
            progress.path.to_path_buf(),
        );
        reported = progress.bytes_hashed;
        stats_tx.send(entry).context("stats collector is gone")
    })?;

    tracing::debug!(elapsed = ?started.elapsed(), "hashed the content");
    Ok(())
}

/// Missing output means the current directory. Directories get `<name>.torrent` inside them.
fn output_path(output: Option<&Path>, name: &str) -> PathBuf {
    let file_name = format!("{name}.torrent");
    match output {
        None => PathBuf::from(file_name),
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(path) => path.to_path_buf(),
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_the_current_directory() {
        assert_eq!(output_path(None, "album"), PathBuf::from("album.torrent"));
        assert_eq!(output_path(None, "my.album"), PathBuf::from("my.album.torrent"));
    }

    #[test]
    fn single_files_lose_their_extension() {
        assert_eq!(file_stem("movie.mkv"), "movie");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn output_directory_gets_a_file_name() {
        let dir = tempfile::tempdir().expect("failed to create a temp dir");
        assert_eq!(output_path(Some(dir.path()), "album"), dir.path().join("album.torrent"));
    }

    #[test]
    fn explicit_output_file_is_kept() {
        let path = Path::new("/definitely/not/a/dir/custom.torrent");
        assert_eq!(output_path(Some(path), "album"), path.to_path_buf());
    }
}
