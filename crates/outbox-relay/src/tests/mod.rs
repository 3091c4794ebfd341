//! Integration tests for the outbox relay.
//!
//! Test organization:
//! - `harness.rs` - Mock store, mock broker, and shared builders
//! - `ordering.rs` - Oldest-first delivery and batch limits
//! - `delivery.rs` - Wire format and sent bookkeeping
//! - `crash_safety.rs` - State persistence and at-least-once redelivery
//! - `transport_failure.rs` - Broker outages, timeouts, and reconnects
//! - `lifecycle.rs` - Run, stop, and status transitions
//! - `invariants.rs` - Cycle overlap and counter guarantees


// Re-exports for external test usage if needed
#[allow(unused_imports)]
pub use harness::{MockBroker, MockStore};
