// Stream supervisors: one cancellable stats subscription task per container.
// `stop` cancels and joins, so nothing from a stopped stream reaches the aggregator afterwards.

use crate::aggregator::AggregatorMsg;
use crate::decoder;
use crate::models::ContainerId;
use crate::runtime::ContainerRuntime;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Why a supervisor ended without being asked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The runtime closed the stream (usually the container stopped).
    Ended,
    /// Opening or reading the stream failed.
    Failed(String),
}

/// Reported to the dispatcher when a stream ends on its own.
#[derive(Debug, Clone)]
pub struct SupervisorExit {
    pub id: ContainerId,
    pub generation: u64,
    pub reason: ExitReason,
}

struct StreamHandle {
    generation: u64,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Registry of live supervisors, keyed by container. Owned by the dispatcher.
pub struct SupervisorRegistry {
    handles: HashMap<ContainerId, StreamHandle>,
    next_generation: u64,
    samples_tx: mpsc::Sender<AggregatorMsg>,
    exits_tx: mpsc::UnboundedSender<SupervisorExit>,
}

impl SupervisorRegistry {
    /// `exits_tx` is unbounded: the dispatcher may be joining a supervisor
    /// while that supervisor reports its exit, so the report must never wait.
    pub fn new(
        samples_tx: mpsc::Sender<AggregatorMsg>,
        exits_tx: mpsc::UnboundedSender<SupervisorExit>,
    ) -> Self {
        Self {
            handles: HashMap::new(),
            next_generation: 0,
            samples_tx,
            exits_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.handles.contains_key(id)
    }

    /// Whether `exit` came from the supervisor currently registered for its id.
    pub fn is_current(&self, exit: &SupervisorExit) -> bool {
        self.handles
            .get(&exit.id)
            .is_some_and(|h| h.generation == exit.generation)
    }

    /// Starts streaming stats for `id`. Returns `None` when a supervisor is already
    /// registered for the id; the existing one is left untouched.
    pub fn start<R: ContainerRuntime>(&mut self, id: ContainerId, runtime: Arc<R>) -> Option<u64> {
        let entry = match self.handles.entry(id.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(e) => e,
        };
        let generation = self.next_generation;
        self.next_generation += 1;

        let (cancel, cancel_rx) = oneshot::channel();
        let samples_tx = self.samples_tx.clone();
        let exits_tx = self.exits_tx.clone();
        let task = tokio::spawn(async move {
            let reason = forward(runtime.as_ref(), &id, cancel_rx, &samples_tx).await;
            // Always last: everything this supervisor sent is now ahead of it in the queue.
            let _ = samples_tx
                .send(AggregatorMsg::Removed { id: id.clone() })
                .await;
            if let Some(reason) = reason {
                let _ = exits_tx.send(SupervisorExit {
                    id,
                    generation,
                    reason,
                });
            }
        });

        entry.insert(StreamHandle {
            generation,
            cancel,
            task,
        });
        Some(generation)
    }

    /// Cancels the supervisor for `id` and waits until its task has exited.
    /// Returns false if nothing was registered.
    pub async fn stop(&mut self, id: &ContainerId) -> bool {
        let Some(handle) = self.handles.remove(id) else {
            return false;
        };
        // Err only means the task already finished on its own.
        let _ = handle.cancel.send(());
        if let Err(e) = handle.task.await {
            warn!("Stats supervisor task for container {} failed: {}", id, e);
        }
        debug!(container_id = %id, "stats supervisor stopped");
        true
    }

    pub async fn stop_all(&mut self) {
        let ids: Vec<ContainerId> = self.handles.keys().cloned().collect();
        for id in ids {
            self.stop(&id).await;
        }
    }
}

/// Forwards decoded samples until cancelled (returns `None`) or the stream ends/fails.
async fn forward<R: ContainerRuntime>(
    runtime: &R,
    id: &ContainerId,
    mut cancel_rx: oneshot::Receiver<()>,
    samples_tx: &mpsc::Sender<AggregatorMsg>,
) -> Option<ExitReason> {
    info!("Starting stats stream for container {}", id.short());
    let mut stream = runtime.stream_stats(id);
    loop {
        tokio::select! {
            biased;
            _ = &mut cancel_rx => return None,
            item = stream.next() => {
                let raw = match item {
                    Some(Ok(raw)) => raw,
                    Some(Err(e)) => {
                        warn!("Stats stream error for container {}: {}", id.short(), e);
                        return Some(ExitReason::Failed(e.to_string()));
                    }
                    None => {
                        info!("Stats stream ended for container {}", id.short());
                        return Some(ExitReason::Ended);
                    }
                };
                let msg = AggregatorMsg::Sample {
                    id: id.clone(),
                    sample: decoder::decode(&raw),
                };
                tokio::select! {
                    biased;
                    // in-flight sample is dropped, not delivered late
                    _ = &mut cancel_rx => return None,
                    sent = samples_tx.send(msg) => {
                        if sent.is_err() {
                            debug!(container_id = %id, "aggregator closed");
                            return None;
                        }
                    }
                }
            }
        }
    }
}
