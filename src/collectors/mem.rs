use crate::host::HostView;
use crate::models::storage::used_pct;
use crate::models::system::MemInfo;
use std::collections::HashMap;

pub fn mem_info(host: &dyn HostView) -> MemInfo {
    match host.read_to_string("/proc/meminfo") {
        Ok(text) => parse_meminfo(&text),
        Err(e)   => {
            tracing::warn!("memory info unavailable: {}", e);
            MemInfo::default()
        }
    }
}

/// `/proc/meminfo` values are in kB; the dashboard wants MiB.
pub fn parse_meminfo(text: &str) -> MemInfo {
    let kb: HashMap<&str, u64> = text.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), value))
        })
        .collect();

    let total = kb.get("MemTotal").copied().unwrap_or(0);
    let free  = kb.get("MemFree").copied().unwrap_or(0);
    let available = kb.get("MemAvailable").copied().unwrap_or_else(|| {
        free + kb.get("Buffers").copied().unwrap_or(0) + kb.get("Cached").copied().unwrap_or(0)
    });

    let total_mb = total / 1024;
    let used_mb  = total.saturating_sub(available) / 1024;
    MemInfo {
        total_mb,
        used_mb,
        free_mb:      free / 1024,
        used_percent: used_pct(used_mb, total_mb),
    }
}
