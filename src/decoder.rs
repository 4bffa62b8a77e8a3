// Raw stats sample -> CPU/memory percentages

use crate::models::{DecodedSample, RawSample};

/// Decodes one raw sample. CPU is relative to the whole host (100% per online CPU),
/// memory is relative to the container limit. Both are rounded to one decimal.
pub fn decode(raw: &RawSample) -> DecodedSample {
    DecodedSample {
        cpu_percent: round1(cpu_percent(raw)),
        mem_percent: round1(mem_percent(raw)),
        read_at: raw.read_at,
    }
}

fn cpu_percent(raw: &RawSample) -> f64 {
    let cpu_delta = raw.cpu_total_usage as i128 - raw.precpu_total_usage as i128;
    let system_delta = raw.system_cpu_usage as i128 - raw.presystem_cpu_usage as i128;
    if cpu_delta <= 0 || system_delta <= 0 {
        return 0.0;
    }
    (cpu_delta as f64 / system_delta as f64) * f64::from(raw.online_cpus) * 100.0
}

fn mem_percent(raw: &RawSample) -> f64 {
    if raw.memory_limit_bytes == 0 {
        return 0.0;
    }
    raw.memory_usage_bytes as f64 / raw.memory_limit_bytes as f64 * 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
