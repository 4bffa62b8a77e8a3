// Lifecycle dispatcher: the only writer of the active container set.
// Processes one runtime event at a time; starts/stops stream supervisors accordingly.

use crate::aggregator::AggregatorMsg;
use crate::models::{ActiveContainers, ContainerId, DashboardEvent, LifecycleEvent, LifecycleKind};
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::supervisor::{SupervisorExit, SupervisorRegistry};
use futures_util::StreamExt;
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Runtime events buffered between the pump task and the dispatcher loop.
const EVENT_BUFFER: usize = 64;

/// Outbound channels of the dispatcher.
pub struct DispatcherLinks {
    pub aggregator_tx: mpsc::Sender<AggregatorMsg>,
    pub ui_tx: mpsc::Sender<DashboardEvent>,
    pub active_tx: watch::Sender<ActiveContainers>,
}

pub struct Dispatcher<R: ContainerRuntime> {
    runtime: Arc<R>,
    active: ActiveContainers,
    supervisors: SupervisorRegistry,
    exits_rx: mpsc::UnboundedReceiver<SupervisorExit>,
    aggregator_tx: mpsc::Sender<AggregatorMsg>,
    ui_tx: mpsc::Sender<DashboardEvent>,
    active_tx: watch::Sender<ActiveContainers>,
}

enum Step {
    Shutdown,
    Event(Option<Result<LifecycleEvent, RuntimeError>>),
    Exit(SupervisorExit),
}

impl<R: ContainerRuntime> Dispatcher<R> {
    pub fn new(runtime: Arc<R>, links: DispatcherLinks) -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        let supervisors = SupervisorRegistry::new(links.aggregator_tx.clone(), exits_tx);
        Self {
            runtime,
            active: ActiveContainers::default(),
            supervisors,
            exits_rx,
            aggregator_tx: links.aggregator_tx,
            ui_tx: links.ui_tx,
            active_tx: links.active_tx,
        }
    }

    pub fn active(&self) -> &ActiveContainers {
        &self.active
    }

    /// Number of live stream supervisors.
    pub fn supervised(&self) -> usize {
        self.supervisors.len()
    }

    /// Main loop. The event subscription is opened by a pump task and confirmed
    /// before running containers are listed, so nothing slips between the two.
    #[instrument(skip_all, name = "dispatcher")]
    pub async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        let (mut events, pump) = spawn_event_pump(self.runtime.clone()).await;
        let mut events_open = true;

        self.reconcile().await;

        loop {
            let step = tokio::select! {
                _ = &mut shutdown_rx => Step::Shutdown,
                Some(exit) = self.exits_rx.recv() => Step::Exit(exit),
                evt = events.recv(), if events_open => Step::Event(evt),
            };
            match step {
                Step::Shutdown => break,
                Step::Exit(exit) => self.on_supervisor_exit(exit).await,
                Step::Event(Some(Ok(evt))) => self.on_runtime_event(evt).await,
                Step::Event(Some(Err(e))) => {
                    warn!("Runtime event stream error: {}", e);
                }
                Step::Event(None) => {
                    warn!("Runtime event stream closed; no further containers will be picked up");
                    events_open = false;
                }
            }
        }

        pump.abort();
        debug!(supervisors = self.supervisors.len(), "Dispatcher shutting down");
        self.supervisors.stop_all().await;
    }

    /// Treats every currently running container as freshly started.
    pub async fn reconcile(&mut self) {
        match self.runtime.list_running().await {
            Ok(ids) => {
                info!("Listing {} initial containers as started", ids.len());
                for id in ids {
                    self.on_runtime_event(LifecycleEvent::started(id)).await;
                }
            }
            Err(e) => warn!("Failed to list running containers: {}", e),
        }
    }

    pub async fn on_runtime_event(&mut self, evt: LifecycleEvent) {
        match evt.kind {
            LifecycleKind::Started => self.on_started(evt.id).await,
            LifecycleKind::Died => self.on_died(evt.id).await,
        }
    }

    async fn on_started(&mut self, id: ContainerId) {
        if self.active.contains(&id) || self.supervisors.contains(&id) {
            warn!("Duplicate start for container {} ignored; existing stream kept", id);
            return;
        }
        let record = match self.runtime.inspect(&id).await {
            Ok(record) => Arc::new(record),
            Err(e) => {
                warn!("Failed to inspect started container {}: {}", id, e);
                return;
            }
        };
        info!("Container started: {} ({})", record.name, id.short());

        self.active.insert(record.clone());
        self.publish_active();
        let started_at = record.started_at;
        if self
            .ui_tx
            .send(DashboardEvent::ContainerAdded(record))
            .await
            .is_err()
        {
            debug!("dashboard receiver dropped");
        }
        if self
            .aggregator_tx
            .send(AggregatorMsg::Track {
                id: id.clone(),
                started_at,
            })
            .await
            .is_err()
        {
            debug!("aggregator closed");
        }
        self.supervisors.start(id, self.runtime.clone());
    }

    async fn on_died(&mut self, id: ContainerId) {
        if !self.active.contains(&id) {
            debug!(container_id = %id, "die for untracked container ignored");
            return;
        }
        info!("Container died: {}", id.short());
        self.remove(id).await;
    }

    /// Handles a stream that ended on its own as an implicit removal.
    pub async fn on_supervisor_exit(&mut self, exit: SupervisorExit) {
        if !self.supervisors.is_current(&exit) {
            debug!(
                container_id = %exit.id,
                generation = exit.generation,
                "stale supervisor exit ignored"
            );
            return;
        }
        info!(
            "Stats stream for container {} closed ({:?}); dropping container",
            exit.id.short(),
            exit.reason
        );
        self.remove(exit.id).await;
    }

    /// Waits for the next supervisor exit report.
    pub async fn next_supervisor_exit(&mut self) -> Option<SupervisorExit> {
        self.exits_rx.recv().await
    }

    async fn remove(&mut self, id: ContainerId) {
        if self
            .ui_tx
            .send(DashboardEvent::ContainerRemoved(id.clone()))
            .await
            .is_err()
        {
            debug!("dashboard receiver dropped");
        }
        self.supervisors.stop(&id).await;
        self.active.remove(&id);
        self.publish_active();
    }

    fn publish_active(&self) {
        self.active_tx.send_replace(self.active.clone());
    }
}

type EventItem = Result<LifecycleEvent, RuntimeError>;

/// Drives `lifecycle_events` on its own task. Returns once the stream has been polled,
/// which is what opens the subscription on lazily connecting runtimes.
async fn spawn_event_pump<R: ContainerRuntime>(
    runtime: Arc<R>,
) -> (mpsc::Receiver<EventItem>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<EventItem>(EVENT_BUFFER);
    let (subscribed_tx, subscribed_rx) = oneshot::channel();
    let pump = tokio::spawn(async move {
        let mut events = runtime.lifecycle_events();
        let first = futures_util::poll!(events.next());
        let _ = subscribed_tx.send(());
        let mut next = match first {
            Poll::Ready(item) => item,
            Poll::Pending => events.next().await,
        };
        while let Some(item) = next {
            if tx.send(item).await.is_err() {
                return;
            }
            next = events.next().await;
        }
    });
    // Err means the pump already ended; the closed channel reports that to the loop.
    let _ = subscribed_rx.await;
    (rx, pump)
}
