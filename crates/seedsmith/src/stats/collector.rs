use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedReceiver, Mutex};

use super::{StatsEntry, StatsSharedState};

pub(super) struct StatsCollector {
    state: Arc<Mutex<StatsSharedState>>,
    stats_rx: UnboundedReceiver<StatsEntry>,
}

impl StatsCollector {
    pub fn new(state: Arc<Mutex<StatsSharedState>>, rx: UnboundedReceiver<StatsEntry>) -> Self {
        StatsCollector { state, stats_rx: rx }
    }

    #[tracing::instrument(skip_all)]
    pub async fn handle(&mut self) {
        while let Some(entry) = self.stats_rx.recv().await {
            self.state.lock().await.record(entry);
        }

        tracing::debug!("hashing finished, shutting down the stats collector");
    }
}
