// Text content of the info bar, name list and info list

use crate::models::{ChartTotals, ContainerRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Which container attribute the info list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoKind {
    #[default]
    Image,
    Names,
    Ports,
    Binds,
    Command,
    Entrypoint,
    Env,
    Volumes,
    StartedAt,
}

impl InfoKind {
    pub const ALL: [InfoKind; 9] = [
        InfoKind::Image,
        InfoKind::Names,
        InfoKind::Ports,
        InfoKind::Binds,
        InfoKind::Command,
        InfoKind::Entrypoint,
        InfoKind::Env,
        InfoKind::Volumes,
        InfoKind::StartedAt,
    ];

    pub fn header(self) -> &'static str {
        match self {
            InfoKind::Image => "Image",
            InfoKind::Names => "Names",
            InfoKind::Ports => "Ports",
            InfoKind::Binds => "Mounts",
            InfoKind::Command => "Command",
            InfoKind::Entrypoint => "Entrypoint",
            InfoKind::Env => "Envs",
            InfoKind::Volumes => "Volumes",
            InfoKind::StartedAt => "Created At",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }

    /// Stops at the last kind.
    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1).min(Self::ALL.len() - 1)]
    }

    /// Stops at the first kind.
    pub fn prev(self) -> Self {
        Self::ALL[self.position().saturating_sub(1)]
    }
}

pub fn info_bar(count: usize, totals: ChartTotals) -> String {
    format!(
        " Cons:{}  Total CPU:{}%  Total Mem:{}%",
        count, totals.cpu_percent as i64, totals.mem_percent as i64
    )
}

/// Go's `time.RubyDate` layout.
pub fn format_started(t: &DateTime<Utc>) -> String {
    t.format("%a %b %d %H:%M:%S %z %Y").to_string()
}

/// `records` must already be newest-first. Rows start at `offset`; rank counts down from the total.
pub fn name_rows(records: &[Arc<ContainerRecord>], offset: usize, inspect: bool) -> Vec<String> {
    let count = records.len();
    records
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(index, record)| {
            let marker = if inspect && index == offset { '*' } else { ' ' };
            format!(
                "{marker}{}. {} {}",
                count - index,
                record.id.short(),
                record.name
            )
        })
        .collect()
}

/// One row per container, or every element of the selected container's attribute in inspect mode.
pub fn info_rows(
    records: &[Arc<ContainerRecord>],
    offset: usize,
    kind: InfoKind,
    inspect: bool,
) -> Vec<String> {
    if inspect {
        return records
            .get(offset)
            .map(|record| inspect_info(kind, record))
            .unwrap_or_default();
    }
    records
        .iter()
        .skip(offset)
        .map(|record| summary_info(kind, record))
        .collect()
}

fn summary_info(kind: InfoKind, record: &ContainerRecord) -> String {
    match kind {
        InfoKind::Image => record.image.clone(),
        InfoKind::Names => match &record.node {
            Some(node) => format!("{node}/{}", record.name),
            None => record.name.clone(),
        },
        InfoKind::Ports => join_display(&record.ports, ","),
        InfoKind::Binds => record.binds.join(","),
        InfoKind::Command => std::iter::once(record.path.as_str())
            .chain(record.args.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        InfoKind::Entrypoint => record.entrypoint.join(" "),
        InfoKind::Env => record.env.join(","),
        InfoKind::Volumes => volumes(record).join(","),
        InfoKind::StartedAt => format_started(&record.started_at),
    }
}

fn inspect_info(kind: InfoKind, record: &ContainerRecord) -> Vec<String> {
    match kind {
        InfoKind::Image => vec![record.image.clone()],
        InfoKind::Names => record
            .node
            .iter()
            .cloned()
            .chain(std::iter::once(record.name.clone()))
            .collect(),
        InfoKind::Ports => record.ports.iter().map(ToString::to_string).collect(),
        InfoKind::Binds => record.binds.clone(),
        InfoKind::Command => std::iter::once(&record.path)
            .chain(&record.args)
            .filter(|s| !s.is_empty())
            .cloned()
            .collect(),
        InfoKind::Entrypoint => record.entrypoint.clone(),
        InfoKind::Env => record.env.clone(),
        InfoKind::Volumes => volumes(record),
        InfoKind::StartedAt => vec![format_started(&record.started_at)],
    }
}

fn volumes(record: &ContainerRecord) -> Vec<String> {
    record
        .mounts
        .iter()
        .map(|m| format!("{}:{}", m.destination, m.source))
        .collect()
}

fn join_display<T: ToString>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}
