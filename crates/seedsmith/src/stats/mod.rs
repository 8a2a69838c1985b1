use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::sync::{mpsc::UnboundedReceiver, oneshot, Mutex};

use self::{buffer::CircularBuffer, collector::StatsCollector, printer::StatsPrinter};

mod buffer;
mod collector;
mod printer;

/// Sent by the hashing thread whenever the hasher reports progress
#[derive(Debug)]
pub struct StatsEntry {
    hashed_at: Instant,
    hashed_bytes: u64,
    file: PathBuf,
}

impl StatsEntry {
    pub fn new(hashed_at: Instant, hashed_bytes: u64, file: PathBuf) -> Self {
        StatsEntry {
            hashed_at,
            hashed_bytes,
            file,
        }
    }
}

/// Collects hashing stats and prints them periodically until every sender is dropped
#[tracing::instrument(err, skip_all)]
pub async fn stats(total: u64, rx: UnboundedReceiver<StatsEntry>) -> anyhow::Result<()> {
    tracing::debug!("starting the stats collector/printer");

    let state = Arc::new(Mutex::new(StatsSharedState::new(total)));

    let mut collector = StatsCollector::new(state.clone(), rx);
    let collector_handle = tokio::spawn(async move { collector.handle().await });

    let printer = StatsPrinter::new(state.clone(), None, total);
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let printer_handle = tokio::spawn(async move { printer.handle(cancel_rx).await });

    collector_handle.await.context("stats collector task")?;

    if cancel_tx.send(()).is_err() {
        tracing::error!("bug: printer exited too early?");
    };

    printer_handle.await.context("stats printer task")?;

    tracing::debug!("successfully stopped stats collector and printer");

    Ok(())
}

struct StatsSharedState {
    prev_entry_time: Instant,
    speed_stats: CircularBuffer<f64>,
    current_file: Option<PathBuf>,
    /// (hashed, left)
    hashing_progress: (u64, u64),
}

impl StatsSharedState {
    fn new(total: u64) -> Self {
        StatsSharedState {
            prev_entry_time: Instant::now(),
            speed_stats: CircularBuffer::new(30),
            current_file: None,
            hashing_progress: (0, total),
        }
    }

    fn record(&mut self, entry: StatsEntry) {
        self.hashing_progress.0 += entry.hashed_bytes;
        self.hashing_progress.1 = self.hashing_progress.1.saturating_sub(entry.hashed_bytes);
        self.current_file = Some(entry.file);

        let elapsed_secs = entry.hashed_at.saturating_duration_since(self.prev_entry_time).as_secs_f64();
        // Reports that arrive at the same instant carry no speed information
        if elapsed_secs > 0. {
            self.speed_stats.push_back(entry.hashed_bytes as f64 / elapsed_secs);
            self.prev_entry_time = entry.hashed_at;
        }
    }

    fn average_speed(&self) -> Option<f64> {
        if self.speed_stats.is_empty() {
            return None;
        }
        let average = self.speed_stats.iter().sum::<f64>() / self.speed_stats.len() as f64;
        (average.is_finite() && average > 0.).then_some(average)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn record_tracks_progress_and_speed() {
        let mut state = StatsSharedState::new(3 << 20);
        let start = state.prev_entry_time;

        state.record(StatsEntry::new(start + Duration::from_secs(1), 1 << 20, PathBuf::from("a")));
        state.record(StatsEntry::new(start + Duration::from_secs(2), 1 << 20, PathBuf::from("b")));

        assert_eq!(state.hashing_progress, (2 << 20, 1 << 20));
        assert_eq!(state.current_file, Some(PathBuf::from("b")));
        let speed = state.average_speed().expect("speed must be known");
        assert!((speed - (1 << 20) as f64).abs() < 1.);
    }

    #[test]
    fn unknown_speed_before_any_report() {
        let state = StatsSharedState::new(100);
        assert!(state.average_speed().is_none());
    }
}
