use crate::collectors::{mounts, topology};
use crate::host::HostView;
use crate::models::storage::{used_pct, StorageRecord};
use std::sync::Arc;

/// Capacity and medium of one mount point. Stateless; every call re-reads the host.
pub struct StorageResolver {
    host:        Arc<dyn HostView>,
    mount_point: String,
}

impl StorageResolver {
    pub fn new(host: Arc<dyn HostView>, mount_point: impl Into<String>) -> Self {
        Self { host, mount_point: mount_point.into() }
    }

    pub fn storage_info(&self) -> StorageRecord {
        storage_info(self.host.as_ref(), &self.mount_point)
    }
}

pub fn storage_info(host: &dyn HostView, mount_point: &str) -> StorageRecord {
    let stats = match host.fs_stats(mount_point) {
        Ok(s)  => s,
        Err(e) => {
            tracing::warn!("statvfs failed: {}", e);
            return StorageRecord::zeroed();
        }
    };

    let total = stats.total_mib();
    let free  = stats.free_mib();
    let used  = total.saturating_sub(free);

    let (device, fs_type) = mounts::backing_device(host, mount_point);
    let disk_class = topology::detect_disk_type(host, &device);
    tracing::debug!("{} on {} ({}) classified {}", mount_point, device, fs_type, disk_class.label());

    StorageRecord {
        device,
        mountpoint:   mount_point.to_string(),
        fs_type,
        disk_class,
        total_mib:    total,
        used_mib:     used,
        free_mib:     free,
        used_percent: used_pct(used, total),
    }
}
