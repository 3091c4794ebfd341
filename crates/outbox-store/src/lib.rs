//! SQLite storage layer for the transactional outbox.
//!
//! This crate provides:
//! - Async SQLite executor with dedicated thread (preferred)
//! - Synchronous `Database` handle for embedded producers and tools
//! - Database migrations
//! - Model types for outbox records
//! - Query helpers for inserting, fetching, and marking records
//!
//! # Architecture
//!
//! The `AsyncDatabase` uses a single dedicated thread for all SQLite
//! operations. Queries are sent through a channel and executed in FIFO order.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let unsent = db.get_unsent_records(3).await?;
//! ```
//!
//! **Important**: Only SQL operations should run inside `db.call()`.
//! Heavy computation must happen outside.

mod db;
mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;

pub use db::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
