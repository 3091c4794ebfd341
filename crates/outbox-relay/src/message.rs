//! Wire format for published messages.

use crate::error::RelayResult;
use chrono::{DateTime, Utc};
use outbox_store::OutboxRecord;
use serde::{Deserialize, Serialize};

/// The payload published to the broker for each relayed record.
///
/// Carries only the fields consumers need to react to a change.
/// `description` and `price` stay in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Build the outbound message for a record.
    pub fn from_record(record: &OutboxRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            created_at: record.created_at,
        }
    }

    /// Encode as UTF-8 JSON bytes.
    pub fn to_bytes(&self) -> RelayResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> OutboxRecord {
        OutboxRecord {
            id: "rec-1".to_string(),
            title: "Widget".to_string(),
            description: "A widget".to_string(),
            price: 9.99,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            sent: false,
        }
    }

    #[test]
    fn test_wire_format_fields() {
        let message = OutboundMessage::from_record(&sample_record());
        let bytes = message.to_bytes().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert_eq!(object["id"], "rec-1");
        assert_eq!(object["title"], "Widget");
        assert_eq!(object["created_at"], "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_wire_format_excludes_store_only_fields() {
        let bytes = OutboundMessage::from_record(&sample_record())
            .to_bytes()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(value.get("description").is_none());
        assert!(value.get("price").is_none());
        assert!(value.get("sent").is_none());
    }

    #[test]
    fn test_round_trip() {
        let message = OutboundMessage::from_record(&sample_record());
        let bytes = message.to_bytes().unwrap();

        let decoded: OutboundMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, message);
    }
}
