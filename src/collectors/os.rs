use crate::host::HostView;
use crate::models::system::OsInfo;

pub fn os_info(host: &dyn HostView) -> OsInfo {
    let release = host.read_to_string("/etc/os-release")
        .or_else(|_| host.read_to_string("/usr/lib/os-release"))
        .unwrap_or_default();
    let (name, id) = parse_os_release(&release);

    let kernel = first_line(host, &["/proc/sys/kernel/osrelease"]);
    let hostname = first_line(host, &["/proc/sys/kernel/hostname", "/etc/hostname"]);
    let uptime = host.read_to_string("/proc/uptime").ok()
        .and_then(|t| parse_uptime_secs(&t))
        .map(format_uptime)
        .unwrap_or_else(|| "Unknown".to_string());

    OsInfo { id, name, arch: arch_label(std::env::consts::ARCH), kernel, uptime, hostname }
}

fn first_line(host: &dyn HostView, paths: &[&str]) -> String {
    paths.iter()
        .filter_map(|p| host.read_to_string(p).ok())
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// `(PRETTY_NAME, ID)` with the dashboard's defaults.
pub fn parse_os_release(text: &str) -> (String, String) {
    let mut name = None;
    let mut id = None;
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("PRETTY_NAME=") {
            name = Some(v.trim_matches('"').to_string());
        } else if let Some(v) = line.strip_prefix("ID=") {
            id = Some(v.trim_matches('"').to_string());
        }
    }
    (
        name.filter(|s| !s.is_empty()).unwrap_or_else(|| "Unknown OS".into()),
        id.filter(|s| !s.is_empty()).unwrap_or_else(|| "unknown".into()),
    )
}

fn parse_uptime_secs(text: &str) -> Option<u64> {
    let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(secs as u64)
}

/// "2 days 1 hour 5 minutes"; zero components are dropped.
pub fn format_uptime(secs: u64) -> String {
    let days    = secs / 86_400;
    let hours   = secs / 3_600 % 24;
    let minutes = secs / 60 % 60;
    [plural(days, "day"), plural(hours, "hour"), plural(minutes, "minute")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn plural(n: u64, unit: &str) -> Option<String> {
    match n {
        0 => None,
        1 => Some(format!("1 {}", unit)),
        _ => Some(format!("{} {}s", n, unit)),
    }
}

fn arch_label(arch: &str) -> String {
    match arch {
        "x86_64" => "x64".to_string(),
        other    => other.to_string(),
    }
}
