//! Outbox relay: polling publisher for the transactional outbox.
//!
//! The relay moves unsent records from a SQLite outbox table to a Redis
//! stream. Records are marked sent only after the broker has accepted
//! the publish, so a crash at any point results in redelivery.
//!
//! # Core Invariants
//!
//! 1. **At-Least-Once**: A record is marked sent only after a successful publish
//! 2. **Oldest-First**: Each cycle drains unsent records in `created_at` order
//! 3. **Non-Reentrant**: A tick that finds the previous cycle running is skipped
//! 4. **Isolated Failures**: One record's failure never aborts the rest of a cycle
//!
//! # Architecture
//!
//! ```text
//! SQLite outbox -> Relay -> Redis Stream
//!     ^             |
//!     |__ sent=1 <__|
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod publisher;
pub mod relay;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use message::OutboundMessage;
pub use publisher::{Broker, RedisPublisher};
pub use relay::{CycleOutcome, CycleStats, Relay, RelayStatus};
pub use state::{RelayState, StateStore};
pub use store::Store;
