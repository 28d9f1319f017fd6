use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use irhub::{DeliveryPolicy, FrameServer, MarkPolicy, ServerConfig, StoreConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Delivery {
    /// Wait for slow subscribers
    Blocking,
    /// Drop events for subscribers whose queue is full
    DropNewest,
}

/// Collect, decode and fan out infrared remote-control frames
#[derive(Debug, Parser)]
#[command(name = "irhub", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "IRHUB_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Idle timeout and subscription lifetime, in seconds
    #[arg(long, default_value_t = 900)]
    idle_timeout_secs: u64,

    /// Per-write timeout, in milliseconds
    #[arg(long, default_value_t = 1000)]
    write_timeout_ms: u64,

    /// Events buffered per subscriber
    #[arg(long, default_value_t = 16)]
    subscriber_capacity: usize,

    /// What to do when a subscriber's buffer is full
    #[arg(long, value_enum, default_value_t = Delivery::Blocking)]
    delivery: Delivery,

    /// Reject frames with irregular data marks instead of reading them as 0
    #[arg(long)]
    strict_marks: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let server_config = ServerConfig::with_addr(args.bind)
        .max_connections(args.max_connections)
        .idle_timeout(Duration::from_secs(args.idle_timeout_secs))
        .write_timeout(Duration::from_millis(args.write_timeout_ms));

    let store_config = StoreConfig::default()
        .subscriber_capacity(args.subscriber_capacity)
        .delivery(match args.delivery {
            Delivery::Blocking => DeliveryPolicy::Blocking,
            Delivery::DropNewest => DeliveryPolicy::DropNewest,
        })
        .mark_policy(if args.strict_marks {
            MarkPolicy::Strict
        } else {
            MarkPolicy::Lenient
        });

    let server = FrameServer::with_store_config(server_config, store_config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
