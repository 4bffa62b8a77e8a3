// Docker inspect/event payloads -> ContainerRecord / LifecycleEvent

use crate::models::{ContainerId, ContainerRecord, LifecycleEvent, MountSummary, PortMapping};
use bollard::models::{ContainerInspectResponse, EventMessage, PortBinding};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Label docker swarm puts on task containers.
const SWARM_NODE_LABEL: &str = "com.docker.swarm.node.id";

pub(crate) fn parse_timestamp(s: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Only `start` and `die` map to lifecycle events; anything else is dropped.
pub(crate) fn lifecycle_event(msg: &EventMessage) -> Option<LifecycleEvent> {
    let id = msg.actor.as_ref()?.id.as_deref()?;
    match msg.action.as_deref()? {
        "start" => Some(LifecycleEvent::started(id)),
        "die" => Some(LifecycleEvent::died(id)),
        _ => None,
    }
}

pub(crate) fn container_record(
    requested: &ContainerId,
    c: &ContainerInspectResponse,
) -> ContainerRecord {
    let id = c
        .id
        .as_deref()
        .map(ContainerId::from)
        .unwrap_or_else(|| requested.clone());
    let name = c
        .name
        .as_deref()
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();
    let config = c.config.as_ref();

    let created_at = parse_timestamp(c.created.as_deref());
    let started_at = parse_timestamp(
        c.state
            .as_ref()
            .and_then(|s| s.started_at.as_deref()),
    )
    .or(created_at)
    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let ports = c
        .network_settings
        .as_ref()
        .and_then(|n| n.ports.as_ref())
        .map(port_mappings)
        .unwrap_or_default();

    let mounts = c
        .mounts
        .as_ref()
        .map(|mounts| {
            mounts
                .iter()
                .map(|m| MountSummary {
                    source: m.source.clone().unwrap_or_default(),
                    destination: m.destination.clone().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    ContainerRecord {
        id,
        name,
        image: config
            .and_then(|cfg| cfg.image.clone())
            .or_else(|| c.image.clone())
            .unwrap_or_default(),
        created_at,
        started_at,
        binds: c
            .host_config
            .as_ref()
            .and_then(|h| h.binds.clone())
            .unwrap_or_default(),
        mounts,
        ports,
        env: config.and_then(|cfg| cfg.env.clone()).unwrap_or_default(),
        path: c.path.clone().unwrap_or_default(),
        args: c.args.clone().unwrap_or_default(),
        entrypoint: config
            .and_then(|cfg| cfg.entrypoint.clone())
            .unwrap_or_default(),
        node: config
            .and_then(|cfg| cfg.labels.as_ref())
            .and_then(|labels| labels.get(SWARM_NODE_LABEL).cloned()),
    }
}

/// Flattens `{"80/tcp": [bindings]}`: one mapping per binding, or a single unbound one.
fn port_mappings(ports: &HashMap<String, Option<Vec<PortBinding>>>) -> Vec<PortMapping> {
    let mut out = Vec::new();
    for (key, bindings) in ports {
        let container_port = key.split('/').next().unwrap_or(key).to_string();
        match bindings.as_deref() {
            None | Some([]) => out.push(PortMapping {
                container_port,
                host_ip: None,
                host_port: None,
            }),
            Some(bindings) => out.extend(bindings.iter().map(|b| PortMapping {
                container_port: container_port.clone(),
                host_ip: b.host_ip.clone(),
                host_port: b.host_port.clone(),
            })),
        }
    }
    out.sort();
    out
}
