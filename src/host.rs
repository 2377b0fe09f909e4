use crate::error::TelemetryError;
use crate::models::storage::FsStats;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the dashboard expects the host's `/` when it runs inside a container.
pub const DEFAULT_HOST_ROOT: &str = "/mnt/host";

/// Read-only view of the machine being reported on.
///
/// Every collector goes through this instead of `std::fs`, so the same code
/// can inspect the local machine, a bind-mounted host root, or a test fixture.
pub trait HostView: Send + Sync {
    /// Map an absolute host path (`/proc/mounts`) onto the local filesystem.
    fn resolve(&self, path: &str) -> PathBuf;

    fn read_to_string(&self, path: &str) -> Result<String, TelemetryError> {
        fs::read_to_string(self.resolve(path))
            .map_err(|e| TelemetryError::unavailable(path, e))
    }

    fn read_link(&self, path: &str) -> Result<PathBuf, TelemetryError> {
        fs::read_link(self.resolve(path))
            .map_err(|e| TelemetryError::unavailable(path, e))
    }

    /// Entry names of a directory, sorted. A missing directory is an error,
    /// an empty one is `Ok(vec![])`.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, TelemetryError> {
        let rd = fs::read_dir(self.resolve(path))
            .map_err(|e| TelemetryError::unavailable(path, e))?;
        let mut names: Vec<String> = rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    fn fs_stats(&self, mount: &str) -> Result<FsStats, TelemetryError> {
        use nix::sys::statvfs::statvfs;
        let st = statvfs(&self.resolve(mount))
            .map_err(|e| TelemetryError::unavailable(mount, io::Error::from(e)))?;
        Ok(FsStats {
            fragment_size:    st.fragment_size() as u64,
            blocks:           st.blocks() as u64,
            blocks_free:      st.blocks_free() as u64,
        })
    }
}

/// Host-root indirection: `Some(root)` prefixes every lookup, `None` reads
/// the local machine directly.
#[derive(Debug, Clone, Default)]
pub struct HostRoot {
    root: Option<PathBuf>,
}

impl HostRoot {
    /// The machine this process runs on.
    pub fn local() -> Self {
        Self { root: None }
    }

    /// Always read under `root`, whether or not it exists yet.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    /// Use `candidate` if it is an existing directory, the local view otherwise.
    pub fn detect(candidate: &Path) -> Self {
        if candidate.is_dir() {
            tracing::info!("reading host state under {}", candidate.display());
            Self::at(candidate)
        } else {
            tracing::debug!("{} not present, reading local host", candidate.display());
            Self::local()
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl HostView for HostRoot {
    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None       => PathBuf::from(path),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_view_uses_bare_paths() {
        let h = HostRoot::local();
        assert_eq!(h.resolve("/proc/mounts"), PathBuf::from("/proc/mounts"));
    }

    #[test]
    fn rooted_view_prefixes_paths() {
        let h = HostRoot::at("/mnt/host");
        assert_eq!(h.resolve("/proc/mounts"), PathBuf::from("/mnt/host/proc/mounts"));
    }

    #[test]
    fn detect_falls_back_when_root_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(HostRoot::detect(&missing).root().is_none());
        assert_eq!(HostRoot::detect(tmp.path()).root(), Some(tmp.path()));
    }

    #[test]
    fn list_dir_is_sorted_and_empty_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let h = HostRoot::at(tmp.path());
        fs::create_dir_all(tmp.path().join("sys/block/dm-0/slaves/sdb")).unwrap();
        fs::create_dir_all(tmp.path().join("sys/block/dm-0/slaves/sda")).unwrap();
        fs::create_dir_all(tmp.path().join("sys/block/sda/slaves")).unwrap();

        assert_eq!(h.list_dir("/sys/block/dm-0/slaves").unwrap(), vec!["sda", "sdb"]);
        assert!(h.list_dir("/sys/block/sda/slaves").unwrap().is_empty());
        assert!(h.list_dir("/sys/block/sdz/slaves").is_err());
    }
}
