use crate::host::HostView;
use crate::models::system::CpuInfo;
use std::collections::HashSet;

pub fn cpu_info(host: &dyn HostView) -> CpuInfo {
    match host.read_to_string("/proc/cpuinfo") {
        Ok(text) => parse_cpuinfo(&text, available_threads()),
        Err(e)   => {
            tracing::warn!("cpu info unavailable: {}", e);
            let threads = available_threads();
            CpuInfo {
                brand:     "Unknown".into(),
                model:     "Unknown".into(),
                cores:     (threads / 2).max(1),
                threads,
                frequency: "0.0".into(),
            }
        }
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Parse `/proc/cpuinfo`. `fallback_threads` is used when the file lists no
/// `processor` entries (some ARM kernels).
pub fn parse_cpuinfo(text: &str, fallback_threads: usize) -> CpuInfo {
    let mut model_name: Option<&str> = None;
    let mut mhz: Option<f64> = None;
    let mut cores_per_socket: Option<usize> = None;
    let mut sockets: HashSet<&str> = HashSet::new();
    let mut processors = 0usize;

    for line in text.lines() {
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None         => continue,
        };
        match key {
            "processor"   => processors += 1,
            "model name" | "Model" if model_name.is_none() => model_name = Some(value),
            "cpu MHz"     if mhz.is_none() => mhz = value.parse().ok(),
            "cpu cores"   if cores_per_socket.is_none() => cores_per_socket = value.parse().ok(),
            "physical id" => { sockets.insert(value); }
            _ => {}
        }
    }

    let (brand, model) = split_brand(model_name.unwrap_or("Unknown"));
    let threads = if processors > 0 { processors } else { fallback_threads };
    let cores = match cores_per_socket {
        Some(c) => c * sockets.len().max(1),
        None    => (threads / 2).max(1),
    };

    CpuInfo { brand, model, cores, threads, frequency: format_ghz(mhz) }
}

/// "AMD Ryzen 7 5800H" → ("AMD", "Ryzen 7 5800H").
fn split_brand(full: &str) -> (String, String) {
    match full.split_once(char::is_whitespace) {
        Some((brand, rest)) => (brand.to_string(), rest.trim().to_string()),
        None                => (full.to_string(), String::new()),
    }
}

/// MHz → GHz rounded up to two decimals.
fn format_ghz(mhz: Option<f64>) -> String {
    match mhz {
        Some(m) if m > 0.0 => format!("{:.2}", (m / 1000.0 * 100.0).ceil() / 100.0),
        _ => "0.0".to_string(),
    }
}
