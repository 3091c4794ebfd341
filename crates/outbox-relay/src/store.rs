//! Store abstraction over the outbox table.

use crate::error::RelayResult;
use async_trait::async_trait;
use outbox_store::{AsyncDatabase, OutboxRecord};

/// What the relay needs from an outbox store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch up to `limit` unsent records, oldest first.
    async fn fetch_unsent(&self, limit: u32) -> RelayResult<Vec<OutboxRecord>>;

    /// Mark a record as sent.
    async fn mark_sent(&self, id: &str) -> RelayResult<()>;
}

#[async_trait]
impl Store for AsyncDatabase {
    async fn fetch_unsent(&self, limit: u32) -> RelayResult<Vec<OutboxRecord>> {
        Ok(self.get_unsent_records(limit).await?)
    }

    async fn mark_sent(&self, id: &str) -> RelayResult<()> {
        Ok(self.mark_record_sent(id.to_string()).await?)
    }
}
