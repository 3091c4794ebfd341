//! Configuration for the relay.

use crate::error::{RelayError, RelayResult};
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Redis connection URL
    pub broker_url: String,

    /// Path to the SQLite outbox database
    pub store_path: PathBuf,

    /// Path to the JSON file holding relay progress
    pub state_path: PathBuf,

    /// Redis stream the relay publishes to
    pub queue_name: String,

    /// Maximum records fetched per polling cycle
    pub polling_limit: u32,

    /// Time between polling cycles
    pub polling_interval: Duration,

    /// Timeout for a single broker operation
    pub op_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            broker_url: "redis://127.0.0.1:6379".to_string(),
            store_path: PathBuf::from("outbox.db"),
            state_path: PathBuf::from("relay-state.json"),
            queue_name: "items-updates".to_string(),
            polling_limit: 3,
            polling_interval: Duration::from_secs(5),
            op_timeout: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Validate the configuration.
    ///
    /// Rejects a zero polling limit or interval and an empty queue name.
    pub fn validate(&self) -> RelayResult<()> {
        if self.polling_limit == 0 {
            return Err(RelayError::Config(
                "polling limit must be greater than zero".to_string(),
            ));
        }
        if self.polling_interval.is_zero() {
            return Err(RelayError::Config(
                "polling interval must be greater than zero".to_string(),
            ));
        }
        if self.queue_name.is_empty() {
            return Err(RelayError::Config(
                "queue name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
