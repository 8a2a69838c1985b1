use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{oneshot, Mutex},
    time::interval,
};

use super::StatsSharedState;

const MIB: f64 = 1024. * 1024.;

pub struct StatsPrinter {
    printing_interval_millis: u64,
    state: Arc<Mutex<StatsSharedState>>,
    total_bytes: u64,
}

impl StatsPrinter {
    const DEFAULT_PRINTING_INTERVAL_MILLIS: u64 = 2000;

    pub fn new(state: Arc<Mutex<StatsSharedState>>, printing_interval: Option<u64>, total_bytes: u64) -> Self {
        StatsPrinter {
            printing_interval_millis: printing_interval.unwrap_or(Self::DEFAULT_PRINTING_INTERVAL_MILLIS),
            state,
            total_bytes,
        }
    }

    pub async fn handle(&self, mut cancellation: oneshot::Receiver<()>) {
        let mut interval = interval(Duration::from_millis(self.printing_interval_millis));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let state = self.state.lock().await;
                    tracing::info!("{}", status_line(&state, self.total_bytes));
                }
                _ = &mut cancellation => {
                    break
                }
            }
        }
    }
}

fn status_line(state: &StatsSharedState, total_bytes: u64) -> String {
    let (hashed, left) = state.hashing_progress;
    let hashed_percents = if total_bytes == 0 {
        100.
    } else {
        (hashed as f64 / total_bytes as f64) * 100.
    };

    let (eta, speed) = match state.average_speed() {
        Some(bytes_per_sec) => (
            format!("{:.1} s", left as f64 / bytes_per_sec),
            format!("{:.1} MiB/s", bytes_per_sec / MIB),
        ),
        None => ("-".to_string(), "- MiB/s".to_string()),
    };

    let file = state
        .current_file
        .as_ref()
        .map_or_else(String::new, |file| format!(" - {}", file.display()));

    format!("ETA: {eta} - {hashed_percents:.2}% - {speed}{file}")
}
