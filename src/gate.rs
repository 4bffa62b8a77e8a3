// Publication gate: throttles chart snapshots to one per interval, latest wins

use crate::models::{ChartSnapshot, DashboardEvent};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Holds the newest unpublished snapshot and the last one handed out.
#[derive(Debug, Default)]
pub struct PublicationGate {
    pending: Option<ChartSnapshot>,
    last_published: Option<ChartSnapshot>,
}

impl PublicationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending snapshot. Never publishes on its own.
    pub fn offer(&mut self, snapshot: ChartSnapshot) {
        self.pending = Some(snapshot);
    }

    /// Called on each tick: yields the pending snapshot if it differs from the last published one.
    pub fn take_due(&mut self) -> Option<ChartSnapshot> {
        let pending = self.pending.take()?;
        if self.last_published.as_ref() == Some(&pending) {
            return None;
        }
        self.last_published = Some(pending.clone());
        Some(pending)
    }
}

/// Spawns the gate task. Publishes at most once per `period`; flushes a pending
/// snapshot and exits once the aggregator side closes.
pub fn spawn(
    mut snapshot_rx: mpsc::Receiver<ChartSnapshot>,
    ui_tx: mpsc::Sender<DashboardEvent>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut gate = PublicationGate::new();
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                received = snapshot_rx.recv() => {
                    match received {
                        Some(snapshot) => gate.offer(snapshot),
                        None => break,
                    }
                }
                _ = tick.tick() => {
                    if let Some(snapshot) = gate.take_due()
                        && ui_tx.send(DashboardEvent::Chart(snapshot)).await.is_err()
                    {
                        debug!("dashboard receiver dropped");
                        return;
                    }
                }
            }
        }
        if let Some(snapshot) = gate.take_due()
            && ui_tx.send(DashboardEvent::Chart(snapshot)).await.is_err()
        {
            debug!("dashboard receiver dropped before final flush");
        }
        debug!("Publication gate shutting down");
    })
}
