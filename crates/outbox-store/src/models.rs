//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbox record - a row awaiting (or past) relay to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub sent: bool,
}

/// Payload for inserting a new outbox record.
///
/// The store assigns the id. `created_at` defaults to the insertion time
/// when not provided.
#[derive(Debug, Clone)]
pub struct NewOutboxRecord {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewOutboxRecord {
    pub fn new(title: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            price,
            created_at: None,
        }
    }

    /// Pin the creation timestamp instead of using the insertion time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
