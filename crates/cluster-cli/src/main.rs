mod listen;

use clap::{Parser, Subcommand};
use serde_json::json;

use cluster_protocol::scope::MulticastScope;
use cluster_protocol::timing::HeartbeatTimings;
use cluster_protocol::{DEFAULT_MULTICAST_GROUP, DEFAULT_MULTICAST_PORT};

#[derive(Parser, Debug)]
#[command(name = "clustercast", about = "Event cluster heartbeat tools")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join a heartbeat group and print every heartbeat received
    Listen {
        #[arg(short, long, default_value = DEFAULT_MULTICAST_GROUP)]
        group: String,
        #[arg(short, long, default_value_t = DEFAULT_MULTICAST_PORT)]
        port: u16,
        /// Local interface to join on (default: any)
        #[arg(short, long)]
        interface: Option<String>,
        /// Exit after this many heartbeats
        #[arg(short, long)]
        count: Option<u64>,
    },
    /// Show the effective heartbeat interval and stale time
    Timings {
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Negative = derive from the interval
        #[arg(long, allow_hyphen_values = true)]
        stale_time_ms: Option<i64>,
    },
    /// Show how far a multicast TTL propagates
    Scope {
        ttl: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Listen {
            group,
            port,
            interface,
            count,
        } => {
            let options = listen::ListenOptions::parse(&group, port, interface.as_deref(), count)?;
            listen::run(options, args.json).await?;
        }
        Commands::Timings {
            interval_ms,
            stale_time_ms,
        } => {
            let timings = HeartbeatTimings::new();
            if let Some(ms) = interval_ms {
                timings.set_interval_ms(ms);
            }
            if let Some(ms) = stale_time_ms {
                timings.set_stale_time_ms(ms);
            }

            if args.json {
                let out = json!({
                    "interval_ms": timings.interval_ms(),
                    "stale_time_ms": timings.stale_time_ms(),
                    "stale_time_override": timings.stale_time_override_ms().is_some(),
                });
                println!("{}", out);
            } else {
                println!("Heartbeat timings");
                println!("══════════════════════════════");
                println!("  Interval:     {} ms", timings.interval_ms());
                println!(
                    "  Stale after:  {} ms{}",
                    timings.stale_time_ms(),
                    if timings.stale_time_override_ms().is_some() {
                        " (override)"
                    } else {
                        " (2 × interval + 100)"
                    }
                );
            }
        }
        Commands::Scope { ttl } => {
            let scope = MulticastScope::from_ttl(ttl);
            if args.json {
                println!("{}", json!({ "ttl": ttl, "scope": scope }));
            } else {
                println!("TTL {} → {}", ttl, scope);
            }
        }
    }

    Ok(())
}
