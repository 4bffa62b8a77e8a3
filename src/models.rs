// Domain models shared by the engine and the dashboard

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Length of the abbreviated id shown in the name list (same as `docker ps`).
pub const SHORT_ID_LEN: usize = 12;

/// Opaque container handle as issued by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, or the whole id when shorter.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One published port. `host_ip`/`host_port` are `None` when the port is exposed but unbound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortMapping {
    pub container_port: String,
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.host_ip, &self.host_port) {
            (None, None) => write!(f, "{}->N/A", self.container_port),
            (ip, port) => write!(
                f,
                "{}->{}:{}",
                self.container_port,
                ip.as_deref().unwrap_or(""),
                port.as_deref().unwrap_or("")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSummary {
    pub source: String,
    pub destination: String,
}

/// Metadata captured once via inspection when a container starts. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub binds: Vec<String>,
    pub mounts: Vec<MountSummary>,
    pub ports: Vec<PortMapping>,
    pub env: Vec<String>,
    pub path: String,
    pub args: Vec<String>,
    pub entrypoint: Vec<String>,
    pub node: Option<String>,
}

/// Runtime lifecycle notification kinds the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Started,
    Died,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub id: ContainerId,
}

impl LifecycleEvent {
    pub fn started(id: impl Into<ContainerId>) -> Self {
        Self {
            kind: LifecycleKind::Started,
            id: id.into(),
        }
    }

    pub fn died(id: impl Into<ContainerId>) -> Self {
        Self {
            kind: LifecycleKind::Died,
            id: id.into(),
        }
    }
}

/// Raw statistics reading. Carries both current and previous CPU accounting
/// so decoding needs no state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub cpu_total_usage: u64,
    pub precpu_total_usage: u64,
    pub system_cpu_usage: u64,
    pub presystem_cpu_usage: u64,
    pub online_cpus: u32,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSample {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub read_at: DateTime<Utc>,
}

/// One bar in each chart. `rank` counts from the oldest container (1) to the newest (count).
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub id: ContainerId,
    pub rank: usize,
    pub label: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// Aggregated view of every container's latest sample, newest-started first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSnapshot {
    pub rows: Vec<ChartRow>,
}

/// Sum of all rows, shown in the info bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartTotals {
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

impl ChartSnapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn totals(&self) -> ChartTotals {
        self.rows.iter().fold(ChartTotals::default(), |acc, row| ChartTotals {
            cpu_percent: acc.cpu_percent + row.cpu_percent,
            mem_percent: acc.mem_percent + row.mem_percent,
        })
    }

    /// Rows from `offset` on; empty when the offset is past the end.
    pub fn from_offset(&self, offset: usize) -> &[ChartRow] {
        self.rows.get(offset..).unwrap_or(&[])
    }
}

/// Presentation order used by every panel: start time descending, then id ascending.
pub fn newest_first(
    a: (&DateTime<Utc>, &ContainerId),
    b: (&DateTime<Utc>, &ContainerId),
) -> Ordering {
    b.0.cmp(a.0).then_with(|| a.1.cmp(b.1))
}

/// Read-only copy of the dispatcher's active container set.
#[derive(Debug, Clone, Default)]
pub struct ActiveContainers {
    records: HashMap<ContainerId, Arc<ContainerRecord>>,
}

impl ActiveContainers {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &ContainerId) -> Option<&Arc<ContainerRecord>> {
        self.records.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.records.keys()
    }

    pub fn newest_first(&self) -> Vec<Arc<ContainerRecord>> {
        let mut sorted: Vec<Arc<ContainerRecord>> = self.records.values().cloned().collect();
        sorted.sort_by(|a, b| newest_first((&a.started_at, &a.id), (&b.started_at, &b.id)));
        sorted
    }

    pub(crate) fn insert(&mut self, record: Arc<ContainerRecord>) {
        self.records.insert(record.id.clone(), record);
    }

    pub(crate) fn remove(&mut self, id: &ContainerId) -> Option<Arc<ContainerRecord>> {
        self.records.remove(id)
    }
}

/// Everything the engine hands to the presentation layer.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    ContainerAdded(Arc<ContainerRecord>),
    ContainerRemoved(ContainerId),
    Chart(ChartSnapshot),
}
