//! Resolve a block device path to the physical disk underneath it.
//!
//! `/dev/mapper/vg-root` → `dm-3` → (slaves) `md0` → (slaves) `sdb2` → `sdb`,
//! then classify `sdb` by its sysfs attributes.

use crate::error::TelemetryError;
use crate::host::HostView;
use crate::models::storage::DiskClass;
use std::path::Path;

/// Upper bound on slave hops; real stacks (LUKS on LVM on RAID) stay well below it.
pub const MAX_SLAVE_HOPS: usize = 5;

/// Kernel names where the trailing number is part of the device, not a partition.
const WHOLE_DEVICE_PREFIXES: &[&str] = &[
    "dm-", "md", "nvme", "mmcblk", "loop", "nbd", "zram", "ram", "sr",
];

/// Classify the medium behind `device` (a mount-table device path).
pub fn detect_disk_type(host: &dyn HostView, device: &str) -> DiskClass {
    let name = match kernel_name(host, device) {
        Some(n) => n,
        None    => return DiskClass::UnknownLvm,
    };
    let base = strip_partition(&name);

    let walk = walk_slaves(base, |n| sysfs_slaves(host, n));
    if walk.exhausted {
        let e = TelemetryError::ResolutionExhausted { start: base.to_string(), last: walk.device.clone() };
        tracing::debug!("{}", e);
    } else if walk.hops > 0 {
        tracing::debug!("{} sits on {} ({} hops)", base, walk.device, walk.hops);
    }
    classify(host, &walk.device)
}

/// Turn a device path into a `/sys/block` name, following symlinks where the
/// path is an alias (`/dev/mapper/*`, `/dev/root`, `/dev/<vg>/<lv>`).
///
/// `None` means a mapper alias whose link could not be read.
fn kernel_name(host: &dyn HostView, device: &str) -> Option<String> {
    let base = Path::new(device)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.to_string());

    if !device.starts_with("/dev/") {
        return Some(base);
    }
    let is_mapper = device.starts_with("/dev/mapper/");

    match host.read_link(device) {
        Ok(target) => Some(
            target.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(base),
        ),
        Err(e) if is_mapper => {
            tracing::debug!("cannot follow mapper alias: {}", e);
            None
        }
        // plain device node, or the kernel's /dev/root alias with no link
        Err(_) => Some(base),
    }
}

/// Strip partition suffixes until nothing changes.
///
/// `sda1` → `sda`, `nvme0n1p3` → `nvme0n1`, `mmcblk0p12` → `mmcblk0`,
/// `dm-0` and `md127` stay as they are.
pub fn strip_partition(name: &str) -> &str {
    let mut cur = name;
    loop {
        let next = strip_once(cur);
        if next.len() == cur.len() { return cur; }
        cur = next;
    }
}

fn strip_once(name: &str) -> &str {
    let head = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if head.len() == name.len() || head.is_empty() {
        return name;
    }
    // <base>p<N> where <base> ends in its own device number
    if let Some(base) = head.strip_suffix('p') {
        if base.ends_with(|c: char| c.is_ascii_digit()) {
            return base;
        }
    }
    if WHOLE_DEVICE_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return name;
    }
    head
}

/// Where a slave walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub device:    String,
    pub hops:      usize,
    /// True when the hop limit was hit and the last device still had slaves.
    pub exhausted: bool,
}

/// Follow the first slave of each device for at most [`MAX_SLAVE_HOPS`] hops.
pub fn walk_slaves<F>(start: &str, mut slaves_of: F) -> Walk
where
    F: FnMut(&str) -> Vec<String>,
{
    let mut name = start.to_string();
    for hop in 0..MAX_SLAVE_HOPS {
        let first = match slaves_of(&name).into_iter().next() {
            Some(s) => s,
            None    => return Walk { device: name, hops: hop, exhausted: false },
        };
        name = strip_partition(&first).to_string();
    }
    let exhausted = !slaves_of(&name).is_empty();
    Walk { device: name, hops: MAX_SLAVE_HOPS, exhausted }
}

fn sysfs_slaves(host: &dyn HostView, name: &str) -> Vec<String> {
    host.list_dir(&format!("/sys/block/{}/slaves", name)).unwrap_or_default()
}

fn classify(host: &dyn HostView, name: &str) -> DiskClass {
    if name.starts_with("nvme") {
        return DiskClass::NVMe;
    }
    if name.starts_with("mmcblk") {
        return DiskClass::SSD;
    }
    let rota = host.read_to_string(&format!("/sys/block/{}/queue/rotational", name));
    match rota.as_deref().map(str::trim) {
        Ok("0") => DiskClass::SSD,
        Ok("1") => DiskClass::HDD,
        _ if name.starts_with("dm-") => DiskClass::UnknownLvm,
        _ => DiskClass::Unknown,
    }
}
