// Snapshot aggregator: sole owner of the latest sample per container.
// Every mutation arrives as a message; every mutation yields a fresh ChartSnapshot.

use crate::models::{ChartRow, ChartSnapshot, ContainerId, DecodedSample, newest_first};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Messages accepted by the aggregator task.
#[derive(Debug, Clone)]
pub enum AggregatorMsg {
    /// Sent by the dispatcher before the container's supervisor starts.
    Track {
        id: ContainerId,
        started_at: DateTime<Utc>,
    },
    Sample {
        id: ContainerId,
        sample: DecodedSample,
    },
    /// Final message of a supervisor, after which the id is no longer active.
    Removed { id: ContainerId },
}

#[derive(Debug, Default)]
pub struct Aggregator {
    started_at: HashMap<ContainerId, DateTime<Utc>>,
    latest: HashMap<ContainerId, DecodedSample>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one message. Returns the recomputed snapshot when the chart data changed.
    pub fn apply(&mut self, msg: AggregatorMsg) -> Option<ChartSnapshot> {
        match msg {
            AggregatorMsg::Track { id, started_at } => {
                self.track(id, started_at);
                Some(self.snapshot())
            }
            AggregatorMsg::Sample { id, sample } => self.on_sample(id, sample),
            AggregatorMsg::Removed { id } => Some(self.on_removed(&id)),
        }
    }

    /// Starts charting `id` with a zero reading until its first sample arrives, so the
    /// chart rows line up with the container list from the moment a container starts.
    pub fn track(&mut self, id: ContainerId, started_at: DateTime<Utc>) {
        self.latest.entry(id.clone()).or_insert(DecodedSample {
            cpu_percent: 0.0,
            mem_percent: 0.0,
            read_at: started_at,
        });
        self.started_at.insert(id, started_at);
    }

    /// Stores the sample unless the container is no longer active (late sample).
    pub fn on_sample(&mut self, id: ContainerId, sample: DecodedSample) -> Option<ChartSnapshot> {
        if !self.started_at.contains_key(&id) {
            debug!(container_id = %id, "discarding sample for inactive container");
            return None;
        }
        self.latest.insert(id, sample);
        Some(self.snapshot())
    }

    pub fn on_removed(&mut self, id: &ContainerId) -> ChartSnapshot {
        self.started_at.remove(id);
        self.latest.remove(id);
        self.snapshot()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let mut entries: Vec<(&ContainerId, &DateTime<Utc>, &DecodedSample)> = self
            .latest
            .iter()
            .filter_map(|(id, sample)| self.started_at.get(id).map(|at| (id, at, sample)))
            .collect();
        entries.sort_by(|a, b| newest_first((a.1, a.0), (b.1, b.0)));

        let count = entries.len();
        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(position, (id, _, sample))| {
                let rank = count - position;
                ChartRow {
                    id: id.clone(),
                    rank,
                    label: rank.to_string(),
                    cpu_percent: sample.cpu_percent,
                    mem_percent: sample.mem_percent,
                }
            })
            .collect();
        ChartSnapshot { rows }
    }
}

/// Spawns the aggregator task. Exits once every sender of `rx` is dropped.
pub fn spawn(
    rx: mpsc::Receiver<AggregatorMsg>,
    snapshot_tx: mpsc::Sender<ChartSnapshot>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(rx, snapshot_tx))
}

#[instrument(skip_all, name = "aggregator")]
async fn run(mut rx: mpsc::Receiver<AggregatorMsg>, snapshot_tx: mpsc::Sender<ChartSnapshot>) {
    let mut aggregator = Aggregator::new();
    while let Some(msg) = rx.recv().await {
        if let Some(snapshot) = aggregator.apply(msg)
            && snapshot_tx.send(snapshot).await.is_err()
        {
            debug!("publication gate closed");
            break;
        }
    }
    debug!("Aggregator shutting down");
}
