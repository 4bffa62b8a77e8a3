// Shared test helpers: an in-memory container runtime

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use dockdash::models::*;
use dockdash::runtime::{ContainerRuntime, RuntimeError};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type EventFeed = mpsc::UnboundedSender<Result<LifecycleEvent, RuntimeError>>;
pub type StatsFeed = mpsc::UnboundedSender<Result<RawSample, RuntimeError>>;

/// Runtime driven entirely by the test: events and stats are pushed through channels,
/// inspect answers from a registry of records.
pub struct FakeRuntime {
    records: Mutex<HashMap<ContainerId, ContainerRecord>>,
    running: Mutex<Vec<ContainerId>>,
    events_tx: EventFeed,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<Result<LifecycleEvent, RuntimeError>>>>,
    stats: Mutex<HashMap<ContainerId, mpsc::UnboundedReceiver<Result<RawSample, RuntimeError>>>>,
    failing_stats: Mutex<HashSet<ContainerId>>,
    stats_opened: Mutex<Vec<ContainerId>>,
    /// Events emitted before the event stream is first polled are lost, like an HTTP
    /// subscription that has not been sent yet.
    lazy_events: bool,
    subscribed: Arc<AtomicBool>,
    subscribed_when_listed: Mutex<Option<bool>>,
    start_during_listing: Mutex<Option<ContainerId>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            records: Mutex::default(),
            running: Mutex::default(),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            stats: Mutex::default(),
            failing_stats: Mutex::default(),
            stats_opened: Mutex::default(),
            lazy_events: false,
            subscribed: Arc::default(),
            subscribed_when_listed: Mutex::default(),
            start_during_listing: Mutex::default(),
        }
    }
}

impl FakeRuntime {
    pub fn lazy() -> Self {
        Self {
            lazy_events: true,
            ..Self::default()
        }
    }

    /// Makes `inspect` succeed for the record's id.
    pub fn add_record(&self, record: ContainerRecord) {
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    /// Reported by `list_running` at startup.
    pub fn set_running(&self, ids: &[&str]) {
        *self.running.lock().unwrap() = ids.iter().map(|id| ContainerId::from(*id)).collect();
    }

    pub fn events(&self) -> EventFeed {
        self.events_tx.clone()
    }

    pub fn emit(&self, event: LifecycleEvent) {
        if self.lazy_events && !self.subscribed.load(Ordering::SeqCst) {
            return;
        }
        self.events_tx.send(Ok(event)).unwrap();
    }

    /// `id` starts while `list_running` is answering and is not part of its result.
    pub fn start_during_listing(&self, id: &str) {
        *self.start_during_listing.lock().unwrap() = Some(ContainerId::from(id));
    }

    /// Whether the event stream had been polled when `list_running` ran.
    pub fn subscribed_when_listed(&self) -> Option<bool> {
        *self.subscribed_when_listed.lock().unwrap()
    }

    /// Next `stream_stats` for `id` yields what the returned sender pushes; dropping it ends the stream.
    pub fn stats_feed(&self, id: &str) -> StatsFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.stats.lock().unwrap().insert(ContainerId::from(id), rx);
        tx
    }

    /// Next `stream_stats` for `id` fails on open.
    pub fn fail_stats(&self, id: &str) {
        self.failing_stats.lock().unwrap().insert(ContainerId::from(id));
    }

    pub fn stats_opened(&self) -> Vec<ContainerId> {
        self.stats_opened.lock().unwrap().clone()
    }
}

impl ContainerRuntime for FakeRuntime {
    fn lifecycle_events(&self) -> BoxStream<'_, Result<LifecycleEvent, RuntimeError>> {
        match self.events_rx.lock().unwrap().take() {
            Some(mut rx) => {
                let subscribed = self.subscribed.clone();
                stream::poll_fn(move |cx| {
                    subscribed.store(true, Ordering::SeqCst);
                    rx.poll_recv(cx)
                })
                .boxed()
            }
            None => stream::empty().boxed(),
        }
    }

    async fn list_running(&self) -> Result<Vec<ContainerId>, RuntimeError> {
        *self.subscribed_when_listed.lock().unwrap() = Some(self.subscribed.load(Ordering::SeqCst));
        let running = self.running.lock().unwrap().clone();
        let late = self.start_during_listing.lock().unwrap().take();
        if let Some(id) = late {
            self.emit(LifecycleEvent { kind: LifecycleKind::Started, id });
        }
        Ok(running)
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerRecord, RuntimeError> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(id.clone()))
    }

    fn stream_stats<'a>(
        &'a self,
        id: &'a ContainerId,
    ) -> BoxStream<'a, Result<RawSample, RuntimeError>> {
        self.stats_opened.lock().unwrap().push(id.clone());
        if self.failing_stats.lock().unwrap().remove(id) {
            let err = RuntimeError::Unavailable(format!("stats for {id} refused"));
            return stream::iter(vec![Err(err)]).boxed();
        }
        match self.stats.lock().unwrap().remove(id) {
            Some(mut rx) => stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed(),
            // No feed registered: a healthy stream that never produces.
            None => stream::pending().boxed(),
        }
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

pub fn record(id: &str, started_secs: i64) -> ContainerRecord {
    ContainerRecord {
        id: ContainerId::from(id),
        name: format!("name-{id}"),
        image: "busybox:latest".to_string(),
        created_at: Some(at(started_secs - 1)),
        started_at: at(started_secs),
        binds: vec![],
        mounts: vec![],
        ports: vec![],
        env: vec![],
        path: "sh".to_string(),
        args: vec![],
        entrypoint: vec![],
        node: None,
    }
}

/// Sample with the given deltas over a fixed baseline.
pub fn raw_sample(
    cpu_delta: u64,
    system_delta: u64,
    online_cpus: u32,
    memory_usage_bytes: u64,
    memory_limit_bytes: u64,
) -> RawSample {
    RawSample {
        cpu_total_usage: 1_000_000_000 + cpu_delta,
        precpu_total_usage: 1_000_000_000,
        system_cpu_usage: 10_000_000_000 + system_delta,
        presystem_cpu_usage: 10_000_000_000,
        online_cpus,
        memory_usage_bytes,
        memory_limit_bytes,
        read_at: at(0),
    }
}

/// 25% of 4 CPUs (100.0%) and 50% memory.
pub fn busy_sample() -> RawSample {
    raw_sample(500_000_000, 2_000_000_000, 4, 512, 1024)
}

/// 10% on one CPU and 25% memory.
pub fn light_sample() -> RawSample {
    raw_sample(100_000_000, 1_000_000_000, 1, 256, 1024)
}
