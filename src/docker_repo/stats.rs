// Raw Docker stats API response -> RawSample

use super::inspect::parse_timestamp;
use crate::models::RawSample;
use bollard::models::ContainerStatsResponse;
use chrono::Utc;

/// Extracts the CPU/memory accounting the decoder needs. Missing sections read as zero,
/// which the decoder turns into 0%.
pub(crate) fn raw_sample(s: &ContainerStatsResponse) -> RawSample {
    let cpu_stats = s.cpu_stats.as_ref();
    let precpu_stats = s.precpu_stats.as_ref();

    let cpu_usage = cpu_stats.and_then(|c| c.cpu_usage.as_ref());
    let precpu_usage = precpu_stats.and_then(|c| c.cpu_usage.as_ref());

    // Older daemons leave online_cpus unset; fall back to the per-CPU vector like the docker CLI.
    let online_cpus = cpu_stats
        .and_then(|c| c.online_cpus)
        .filter(|n| *n > 0)
        .map(|n| n as u32)
        .or_else(|| {
            cpu_usage
                .and_then(|u| u.percpu_usage.as_ref())
                .map(|per_cpu| per_cpu.len() as u32)
                .filter(|n| *n > 0)
        })
        .unwrap_or(1);

    let memory = s.memory_stats.as_ref();

    RawSample {
        cpu_total_usage: cpu_usage.and_then(|u| u.total_usage).unwrap_or(0),
        precpu_total_usage: precpu_usage.and_then(|u| u.total_usage).unwrap_or(0),
        system_cpu_usage: cpu_stats.and_then(|c| c.system_cpu_usage).unwrap_or(0),
        presystem_cpu_usage: precpu_stats.and_then(|c| c.system_cpu_usage).unwrap_or(0),
        online_cpus,
        memory_usage_bytes: memory.and_then(|m| m.usage).unwrap_or(0),
        memory_limit_bytes: memory.and_then(|m| m.limit).unwrap_or(0),
        read_at: parse_timestamp(s.read.as_deref()).unwrap_or_else(Utc::now),
    }
}
