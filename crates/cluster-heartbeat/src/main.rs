use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use cluster_heartbeat::{ConfiguredIdentity, DaemonConfig, HeartbeatSender, HeartbeatTimings};

#[derive(Parser, Debug)]
#[command(name = "cluster-heartbeat", about = "Multicast keepalive heartbeat daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/heartbeat.toml")]
    config: PathBuf,

    /// Override the heartbeat interval from the config file (ms)
    #[arg(long, env = "HEARTBEAT_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Override the advertised URL from the config file
    #[arg(long, env = "HEARTBEAT_URL")]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = DaemonConfig::load(&args.config).await.map_err(|e| {
        error!("Failed to load config: {:#}", e);
        e
    })?;

    if let Some(interval_ms) = args.interval_ms {
        config.heartbeat.interval_ms = interval_ms;
    }
    if args.url.is_some() {
        config.node.url = args.url;
    }

    let heartbeat_config = config.heartbeat_config()?;

    let timings = Arc::new(HeartbeatTimings::new());
    config.apply_timings(&timings);

    let identity = Arc::new(ConfiguredIdentity::new(config.node.url.clone()));

    info!(
        group = %heartbeat_config.group,
        port = heartbeat_config.port,
        ttl = heartbeat_config.ttl,
        url = config.node.url.as_deref().unwrap_or("<unknown>"),
        interval_ms = timings.interval_ms(),
        stale_time_ms = timings.stale_time_ms(),
        "Heartbeat daemon starting"
    );

    let mut sender = HeartbeatSender::new(heartbeat_config, identity, Arc::clone(&timings));
    info!(scope = %sender.scope(), "Multicast scope");
    sender.start();

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    let stats = sender.stats();
    sender.shutdown().await;

    info!(
        heartbeats_sent = stats.heartbeats_sent,
        send_failures = stats.send_failures,
        sessions_opened = stats.sessions_opened,
        session_failures = stats.session_failures,
        "Heartbeat daemon stopped"
    );

    Ok(())
}
