// Telemetry engine: wires dispatcher -> supervisors -> aggregator -> gate.
// The presentation layer only sees `Engine`.

use crate::aggregator::{self, AggregatorMsg};
use crate::dispatcher::{Dispatcher, DispatcherLinks};
use crate::gate;
use crate::models::{ActiveContainers, ChartSnapshot, DashboardEvent};
use crate::runtime::ContainerRuntime;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Minimum spacing between chart publications.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub publish_interval: Duration,
    /// Capacity of each bounded channel between components.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle held by the presentation layer.
pub struct Engine {
    /// Container added/removed notifications (immediate) and throttled chart snapshots.
    pub updates: mpsc::Receiver<DashboardEvent>,
    containers: watch::Receiver<ActiveContainers>,
    shutdown_tx: oneshot::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Engine {
    /// Current active container set, for redraws that don't wait on new data.
    pub fn containers(&self) -> ActiveContainers {
        self.containers.borrow().clone()
    }

    /// Receiver that resolves `changed()` whenever the active set is replaced.
    pub fn watch_containers(&self) -> watch::Receiver<ActiveContainers> {
        self.containers.clone()
    }

    /// Stops every supervisor, then waits for all engine tasks to exit.
    pub async fn shutdown(self) {
        let Engine {
            updates,
            shutdown_tx,
            tasks,
            ..
        } = self;
        // Nobody reads updates any more; make pending sends fail instead of wait.
        drop(updates);
        let _ = shutdown_tx.send(());
        for (name, task) in tasks {
            if let Err(e) = task.await {
                warn!("Engine task {} failed: {}", name, e);
            }
        }
        debug!("Engine stopped");
    }
}

/// Starts the engine on the current tokio runtime.
pub fn spawn<R: ContainerRuntime>(runtime: Arc<R>, config: EngineConfig) -> Engine {
    let capacity = config.channel_capacity;
    let (ui_tx, updates) = mpsc::channel::<DashboardEvent>(capacity);
    let (aggregator_tx, aggregator_rx) = mpsc::channel::<AggregatorMsg>(capacity);
    let (snapshot_tx, snapshot_rx) = mpsc::channel::<ChartSnapshot>(capacity);
    let (active_tx, containers) = watch::channel(ActiveContainers::default());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let gate = gate::spawn(snapshot_rx, ui_tx.clone(), config.publish_interval);
    let aggregator = aggregator::spawn(aggregator_rx, snapshot_tx);
    let dispatcher = Dispatcher::new(
        runtime,
        DispatcherLinks {
            aggregator_tx,
            ui_tx,
            active_tx,
        },
    );
    let dispatcher = tokio::spawn(dispatcher.run(shutdown_rx));

    Engine {
        updates,
        containers,
        shutdown_tx,
        // Shutdown cascades in this order as each task drops its senders.
        tasks: vec![
            ("dispatcher", dispatcher),
            ("aggregator", aggregator),
            ("gate", gate),
        ],
    }
}
