use serde::Serialize;

const MIB: u64 = 1024 * 1024;

/// Physical medium behind a filesystem, as resolved through block topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiskClass {
    #[serde(rename = "NVMe")]
    NVMe,
    #[serde(rename = "SSD")]
    SSD,
    #[serde(rename = "HDD")]
    HDD,
    #[serde(rename = "Unknown")]
    Unknown,
    /// Device-mapper node whose physical disk could not be reached.
    #[serde(rename = "Unknown (LVM)")]
    UnknownLvm,
}

impl DiskClass {
    pub fn label(&self) -> &'static str {
        match self {
            DiskClass::NVMe       => "NVMe",
            DiskClass::SSD        => "SSD",
            DiskClass::HDD        => "HDD",
            DiskClass::Unknown    => "Unknown",
            DiskClass::UnknownLvm => "Unknown (LVM)",
        }
    }
}

/// One row of the live mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device:  String,
    pub mount:   String,
    pub fs_type: String,
}

/// Raw `statvfs` numbers for one mount point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    pub fragment_size: u64,
    pub blocks:        u64,
    pub blocks_free:   u64,
}

impl FsStats {
    pub fn total_mib(&self) -> u64 { self.blocks.saturating_mul(self.fragment_size) / MIB }
    pub fn free_mib(&self)  -> u64 { self.blocks_free.saturating_mul(self.fragment_size) / MIB }
}

/// One mounted filesystem with capacity and medium classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub device:       String,
    pub mountpoint:   String,
    pub fs_type:      String,
    #[serde(rename = "type")]
    pub disk_class:   DiskClass,
    #[serde(rename = "totalMiB")]
    pub total_mib:    u64,
    #[serde(rename = "usedMiB")]
    pub used_mib:     u64,
    #[serde(rename = "freeMiB")]
    pub free_mib:     u64,
    pub used_percent: f64,
}

impl StorageRecord {
    /// What callers get when the mount point cannot even be stat'ed.
    pub fn zeroed() -> Self {
        Self {
            device:       String::new(),
            mountpoint:   String::new(),
            fs_type:      String::new(),
            disk_class:   DiskClass::Unknown,
            total_mib:    0,
            used_mib:     0,
            free_mib:     0,
            used_percent: 0.0,
        }
    }
}

/// `used / total * 100`, or `0.0` for an empty filesystem.
pub fn used_pct(used: u64, total: u64) -> f64 {
    if total == 0 { return 0.0; }
    used as f64 / total as f64 * 100.0
}
