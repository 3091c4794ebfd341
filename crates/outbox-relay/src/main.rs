//! Outbox relay binary entry point.
//!
//! Usage: outbox-relay [--broker-url <url>] [--store-path <path>]
//!
//! Every flag can also be set through its environment variable; see
//! `outbox-relay --help`.

use clap::Parser;
use outbox_relay::{logging, RedisPublisher, Relay, RelayConfig, RelayResult, StateStore};
use outbox_store::AsyncDatabase;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Outbox relay: polling publisher for the transactional outbox.
#[derive(Parser, Debug)]
#[command(name = "outbox-relay")]
#[command(about = "Polling relay that publishes unsent outbox records to Redis Streams")]
struct Args {
    /// Redis connection URL.
    #[arg(long, env = "BROKER_URL", default_value = "redis://127.0.0.1:6379")]
    broker_url: String,

    /// Path to the SQLite outbox database.
    #[arg(long, env = "STORE_PATH", default_value = "outbox.db")]
    store_path: String,

    /// Path to the relay state file.
    #[arg(long, env = "STATE_PATH", default_value = "relay-state.json")]
    state_path: String,

    /// Redis stream to publish to.
    #[arg(long, env = "QUEUE_NAME", default_value = "items-updates")]
    queue_name: String,

    /// Maximum records fetched per polling cycle.
    #[arg(long, env = "POLLING_LIMIT", default_value = "3")]
    polling_limit: u32,

    /// Seconds between polling cycles.
    #[arg(long, env = "POLLING_INTERVAL", default_value = "5")]
    interval_secs: u64,

    /// Timeout in seconds for a single broker operation.
    #[arg(long, env = "OP_TIMEOUT_SECS", default_value = "30")]
    op_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> RelayResult<()> {
    let args = Args::parse();

    logging::init_logging(&args.log_level);

    info!("Outbox relay starting...");

    let config = RelayConfig {
        broker_url: args.broker_url,
        store_path: PathBuf::from(args.store_path),
        state_path: PathBuf::from(args.state_path),
        queue_name: args.queue_name,
        polling_limit: args.polling_limit,
        polling_interval: Duration::from_secs(args.interval_secs),
        op_timeout: Duration::from_secs(args.op_timeout_secs),
    };
    config.validate()?;

    info!(
        broker_url = %config.broker_url,
        store_path = %config.store_path.display(),
        state_path = %config.state_path.display(),
        stream = %config.queue_name,
        limit = config.polling_limit,
        interval_secs = config.polling_interval.as_secs(),
        "Configuration loaded"
    );

    // Startup failures are fatal: without a store and a broker there is
    // nothing to relay.
    let store = AsyncDatabase::open(&config.store_path).await?;
    let publisher = RedisPublisher::connect(&config.broker_url, &config.queue_name).await?;
    let state_store = StateStore::new(config.state_path.clone());

    let relay = Relay::new(config, store, publisher, state_store);

    // Install signal handler for graceful shutdown
    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        result = relay.run() => {
            if let Err(e) = result {
                error!(error = %e, "Relay exited with error");
                return Err(e);
            }
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, stopping relay...");
            relay.stop().await;
        }
    }

    Ok(())
}
