use crate::error::TelemetryError;
use crate::host::HostView;
use crate::models::storage::MountEntry;

/// Reported when the mount table cannot tell us what backs a mount point.
pub const SENTINEL_DEVICE: &str = "/dev/root";
pub const UNKNOWN_FS: &str = "unknown";

const MOUNT_TABLES: &[&str] = &["/proc/mounts", "/proc/self/mounts"];

/// Read the live mount table of the viewed host.
pub fn read_mounts(host: &dyn HostView) -> Result<Vec<MountEntry>, TelemetryError> {
    let mut last_err = None;
    for path in MOUNT_TABLES {
        match host.read_to_string(path) {
            Ok(text) => return Ok(parse_mounts(&text)),
            Err(e)   => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or(TelemetryError::Malformed {
        what:   "mount table",
        detail: "no mount table path configured".into(),
    }))
}

pub fn parse_mounts(text: &str) -> Vec<MountEntry> {
    let mut v = Vec::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 { continue; }
        v.push(MountEntry {
            device:  unescape(fields[0]),
            mount:   unescape(fields[1]),
            fs_type: fields[2].to_string(),
        });
    }
    v
}

/// Pick the entry that really backs `mount_point`.
///
/// An exact non-overlay match wins; otherwise the first entry that is neither
/// overlay nor tmpfs. Containers mount an overlay on `/`, which is why the
/// fallback exists at all.
pub fn find_backing<'a>(mounts: &'a [MountEntry], mount_point: &str) -> Option<&'a MountEntry> {
    mounts.iter()
        .find(|m| m.mount == mount_point && m.fs_type != "overlay")
        .or_else(|| mounts.iter().find(|m| m.fs_type != "overlay" && m.fs_type != "tmpfs"))
}

/// Device path and fs type backing `mount_point`, or the sentinel pair.
pub fn backing_device(host: &dyn HostView, mount_point: &str) -> (String, String) {
    let mounts = match read_mounts(host) {
        Ok(m)  => m,
        Err(e) => {
            tracing::warn!("mount table unreadable: {}", e);
            return (SENTINEL_DEVICE.to_string(), UNKNOWN_FS.to_string());
        }
    };
    match find_backing(&mounts, mount_point) {
        Some(m) => (m.device.clone(), m.fs_type.clone()),
        None    => {
            tracing::debug!("no backing mount for {}", mount_point);
            (SENTINEL_DEVICE.to_string(), UNKNOWN_FS.to_string())
        }
    }
}

/// Decode the `\040`-style octal escapes the kernel uses for whitespace.
fn unescape(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let oct = std::str::from_utf8(&bytes[i + 1..i + 4]).ok()
                .and_then(|s| u8::from_str_radix(s, 8).ok());
            if let Some(b) = oct {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
