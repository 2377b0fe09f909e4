use crate::collectors::bandwidth::ProbeSettings;
use crate::collectors::bench_cache::{DEFAULT_RETRY_AFTER, DEFAULT_VALIDITY};
use crate::host::DEFAULT_HOST_ROOT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `[host] root` without touching the config file.
pub const HOST_ROOT_ENV: &str = "DOVEDASH_HOST_ROOT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind:      String,
    pub port:      u16,
    /// trace, debug, info, warn, error
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory where the monitored host's `/` is mounted. Ignored if it does not exist.
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Mount point reported by /api/storage
    pub mount_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Serve a cached bandwidth sample for this long before probing again.
    pub validity_hours:        u64,
    /// After a failed probe, wait this long before trying again (0 = retry on next request).
    pub retry_after_minutes:   u64,
    pub download_url:          String,
    pub upload_url:            String,
    /// Size of the zero-filled upload body
    pub upload_mib:            u64,
    pub download_timeout_secs: u64,
    pub upload_timeout_secs:   u64,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 2137, log_level: "info".into() }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { root: DEFAULT_HOST_ROOT.into() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { mount_point: "/".into() }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            validity_hours:        DEFAULT_VALIDITY.as_secs() / 3600,
            retry_after_minutes:   DEFAULT_RETRY_AFTER.as_secs() / 60,
            download_url:          "http://speedtest.tele2.net/100MB.zip".into(),
            upload_url:            "http://speedtest.tele2.net/upload.php".into(),
            upload_mib:            50,
            download_timeout_secs: 120,
            upload_timeout_secs:   30,
        }
    }
}

impl BenchmarkConfig {
    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_hours * 3600)
    }

    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_minutes * 60)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            download_url:     self.download_url.clone(),
            upload_url:       self.upload_url.clone(),
            upload_bytes:     self.upload_mib * 1024 * 1024,
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            upload_timeout:   Duration::from_secs(self.upload_timeout_secs),
        }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load the config file, writing defaults on first run.
    ///
    /// Never fails outright: an unreadable or broken file yields defaults
    /// plus the error, so the caller can report it once logging is up.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        let (mut cfg, problem) = match Config::config_path() {
            Some(path) => load_from(&path),
            None       => (Config::default(), Some(anyhow::anyhow!("no config dir"))),
        };
        if let Ok(root) = std::env::var(HOST_ROOT_ENV) {
            cfg.host.root = root;
        }
        (cfg, problem)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dovedash").join("dovedash.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid dovedash.toml")
    }
}

/// Read `path`; a missing file is created with defaults, a present but
/// unparsable one is left alone.
fn load_from(path: &Path) -> (Config, Option<anyhow::Error>) {
    if !path.exists() {
        let written = write_defaults(path)
            .with_context(|| format!("writing default config to {}", path.display()));
        return (Config::default(), written.err());
    }
    let parsed = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .and_then(|text| Config::from_toml(&text));
    match parsed {
        Ok(cfg) => (cfg, None),
        Err(e)  => (Config::default(), Some(e)),
    }
}

fn write_defaults(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# dovedash configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}
