//! Authoritative DNS server entry point.
//!
//! Parses CLI flags (optionally merged under a `--config` TOML/JSON file),
//! builds the validated `Config`, runs the zone updater's synchronous
//! priming pass, binds the UDP socket, and serves until a termination
//! signal arrives — at which point the socket loop is dropped and the zone
//! updater's background task is stopped before exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::UdpSocket;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use healthy_dns::dns::dns_config::{Config, RawConfig, ResolutionEntry};
use healthy_dns::dns::dns_server::run_udp_server;
use healthy_dns::dns::zone_updater::ZoneUpdater;
use healthy_dns::dns::zone_updater_worker::ZoneUpdaterWorker;

/// Authoritative DNS server whose A records track live TCP health checks.
#[derive(Parser, Debug)]
#[command(name = "healthy-dns")]
#[command(author = "AEGIS Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Authoritative DNS server with health-checked A records", long_about = None)]
struct Args {
    /// Primary origin subdomain.
    #[arg(long)]
    hosted_zone: Option<String>,

    /// Alias origins, as a JSON array of strings.
    #[arg(long)]
    alias_zones: Option<String>,

    /// Name servers, as a JSON array of strings.
    #[arg(long)]
    ns: Option<String>,

    /// Per-subdomain IP resolutions, as a JSON object.
    #[arg(long)]
    zone_resolutions: Option<String>,

    /// UDP bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Operator floor for the probe interval, in seconds.
    #[arg(long)]
    test_min_interval: Option<u32>,

    /// TCP connect timeout, in seconds.
    #[arg(long)]
    test_timeout: Option<u32>,

    /// PEM private key path. Absent disables DNSSEC signing.
    #[arg(long)]
    priv_key_path: Option<PathBuf>,

    /// DNSSEC algorithm name.
    #[arg(long)]
    priv_key_alg: Option<String>,

    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Optional TOML/JSON config file, merged under the flags above.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn into_raw(self) -> anyhow::Result<RawConfig> {
        let alias_zones = self
            .alias_zones
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("parsing --alias-zones")?;
        let name_servers = self
            .ns
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("parsing --ns")?;
        let zone_resolutions: Option<std::collections::HashMap<String, ResolutionEntry>> = self
            .zone_resolutions
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("parsing --zone-resolutions")?;

        Ok(RawConfig {
            hosted_zone: self.hosted_zone,
            alias_zones,
            name_servers,
            zone_resolutions,
            port: self.port,
            test_min_interval: self.test_min_interval,
            test_timeout: self.test_timeout,
            priv_key_path: self.priv_key_path,
            priv_key_alg: self.priv_key_alg,
            log_level: self.log_level,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();
    let cli_raw = args.into_raw()?;

    let raw = match &config_path {
        Some(path) => RawConfig::from_file(path)
            .context("loading --config file")?
            .merged_under(cli_raw),
        None => cli_raw,
    };

    init_logging(raw.log_level.as_deref().unwrap_or("info"));

    info!("starting healthy-dns v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_raw(raw).context("building configuration")?);
    let origins = Arc::new(config.origins.clone());
    let bind_port = config.port;

    let mut worker = ZoneUpdaterWorker::new(
        ZoneUpdater::new(config.clone()),
        config.operator_min_interval,
        config.connection_timeout,
    );
    worker.start().await.context("priming the first zone update")?;

    let socket = UdpSocket::bind(("0.0.0.0", bind_port))
        .await
        .with_context(|| format!("binding UDP port {bind_port}"))?;
    info!("listening on UDP port {bind_port}");

    let reader = worker.reader();
    let server_task = tokio::spawn(run_udp_server(socket, reader, origins));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping");

    server_task.abort();
    if !worker.stop().await {
        error!("zone updater did not stop cleanly within its deadline");
    }

    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
