mod collectors;
mod config;
mod error;
mod host;
mod models;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use collectors::bandwidth::HttpProbe;
use collectors::bench_cache::BenchmarkCache;
use collectors::storage::StorageResolver;
use config::Config;
use host::{HostRoot, HostView};
use server::AppState;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "dovedash", about = "Host telemetry dashboard over HTTP", version)]
struct Cli {
    /// Listen address (overrides [server] bind)
    #[arg(long)]
    bind: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the monitored host's `/` (overrides [host] root)
    #[arg(long)]
    host_root: Option<String>,

    /// Mount point reported by /api/storage (overrides [storage] mount_point)
    #[arg(short, long)]
    mount: Option<String>,

    /// trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Print a one-shot JSON snapshot of every endpoint and exit
    #[arg(long)]
    json: bool,

    /// Include a bandwidth probe in the --json snapshot
    #[arg(long, requires = "json")]
    with_net: bool,

    /// Print config file path and effective values, then exit
    #[arg(long)]
    config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut cfg, config_problem) = Config::load();
    if let Some(bind) = cli.bind { cfg.server.bind = bind; }
    if let Some(port) = cli.port { cfg.server.port = port; }
    if let Some(root) = cli.host_root { cfg.host.root = root; }
    if let Some(mount) = cli.mount { cfg.storage.mount_point = mount; }
    if let Some(level) = cli.log_level { cfg.server.log_level = level; }

    init_logging(&cfg.server.log_level)?;
    if let Some(e) = config_problem {
        tracing::warn!("config: {:#}; using defaults", e);
    }

    let host = HostRoot::detect(Path::new(&cfg.host.root));

    if cli.config {
        return run_print_config(&cfg, &host);
    }

    let state = Arc::new(build_state(&cfg, host));

    if cli.json {
        return run_json_snapshot(&state, cli.with_net);
    }

    run_server(&cfg, state)
}

fn init_logging(level: &str) -> Result<()> {
    let level = Level::from_str(level)
        .map_err(|_| anyhow::anyhow!("unknown log level '{}'", level))?;
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber")?;
    Ok(())
}

fn build_state(cfg: &Config, host: HostRoot) -> AppState {
    let host: Arc<dyn HostView> = Arc::new(host);
    let probe = HttpProbe::new(host.clone(), cfg.benchmark.probe_settings());
    AppState {
        storage: StorageResolver::new(host.clone(), cfg.storage.mount_point.clone()),
        bench:   BenchmarkCache::new(Box::new(probe), cfg.benchmark.validity(), cfg.benchmark.retry_after()),
        host,
    }
}

fn run_server(cfg: &Config, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", cfg.server.bind, cfg.server.port);
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        server::serve(listener, state).await
    })
}

fn run_json_snapshot(state: &AppState, with_net: bool) -> Result<()> {
    use collectors::{cpu, mem, os, sensors};
    use serde_json::json;

    let host = state.host.as_ref();
    let mut snapshot = json!({
        "dovedash_version": env!("CARGO_PKG_VERSION"),
        "timestamp":        chrono::Local::now().to_rfc3339(),
        "os":               os::os_info(host),
        "cpu":              cpu::cpu_info(host),
        "mem":              mem::mem_info(host),
        "storage":          state.storage.storage_info(),
        "sensors":          sensors::read_sensors(),
    });
    if with_net {
        snapshot["net"] = serde_json::to_value(state.bench.get())?;
    }

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn run_print_config(cfg: &Config, host: &HostRoot) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let root = host
        .root()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(local, configured root not present)".to_string());
    let b = &cfg.benchmark;
    println!("Config: {}", path);
    println!();
    println!("[server]");
    println!("  bind      = {}", cfg.server.bind);
    println!("  port      = {}", cfg.server.port);
    println!("  log_level = {}", cfg.server.log_level);
    println!();
    println!("[host]");
    println!("  root      = {}", cfg.host.root);
    println!("  in use    = {}", root);
    println!();
    println!("[storage]");
    println!("  mount_point = {}", cfg.storage.mount_point);
    println!();
    println!("[benchmark]");
    println!("  validity_hours        = {}", b.validity_hours);
    println!("  retry_after_minutes   = {}", b.retry_after_minutes);
    println!("  download_url          = {}", b.download_url);
    println!("  upload_url            = {}", b.upload_url);
    println!("  upload_mib            = {}", b.upload_mib);
    println!("  download_timeout_secs = {}", b.download_timeout_secs);
    println!("  upload_timeout_secs   = {}", b.upload_timeout_secs);
    Ok(())
}
