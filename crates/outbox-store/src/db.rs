//! Synchronous database handle.
//!
//! Producers embedded in the same process insert records through this
//! handle inside their own transactions. The relay itself goes through
//! `AsyncDatabase`.

use crate::{migrations, queries, DatabaseResult, NewOutboxRecord, OutboxRecord};
use rusqlite::Connection;
use std::path::Path;

/// Database wrapper with query methods.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, running migrations if needed.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode and performance optimizations
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        // Run migrations
        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        // Note: WAL mode doesn't apply to in-memory databases
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a new outbox record, assigning its id.
    pub fn insert_record(&self, record: &NewOutboxRecord) -> DatabaseResult<OutboxRecord> {
        queries::insert_record(&self.conn, record)
    }

    /// Get an outbox record by ID.
    pub fn get_record(&self, id: &str) -> DatabaseResult<Option<OutboxRecord>> {
        queries::get_record(&self.conn, id)
    }

    /// Fetch up to `limit` unsent records, oldest first.
    pub fn get_unsent_records(&self, limit: u32) -> DatabaseResult<Vec<OutboxRecord>> {
        queries::get_unsent_records(&self.conn, limit)
    }

    /// Mark a record as sent.
    pub fn mark_record_sent(&self, id: &str) -> DatabaseResult<()> {
        queries::mark_record_sent(&self.conn, id)
    }

    /// Count records that have not been relayed yet.
    pub fn count_unsent(&self) -> DatabaseResult<u64> {
        queries::count_unsent(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabaseError;
    use chrono::{Duration, Utc};

    fn create_test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get_record() {
        let db = create_test_db();

        let record = db
            .insert_record(&NewOutboxRecord::new("Widget", "A widget", 9.99))
            .unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.title, "Widget");
        assert_eq!(record.description, "A widget");
        assert_eq!(record.price, 9.99);
        assert!(!record.sent);

        let fetched = db.get_record(&record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn test_get_record_missing_returns_none() {
        let db = create_test_db();
        assert!(db.get_record("no-such-id").unwrap().is_none());
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let db = create_test_db();

        let a = db
            .insert_record(&NewOutboxRecord::new("A", "first", 1.0))
            .unwrap();
        let b = db
            .insert_record(&NewOutboxRecord::new("B", "second", 2.0))
            .unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_unsent_records_ordered_oldest_first() {
        let db = create_test_db();
        let base = Utc::now();

        // Insert out of chronological order
        let newest = db
            .insert_record(
                &NewOutboxRecord::new("newest", "", 3.0).with_created_at(base + Duration::seconds(20)),
            )
            .unwrap();
        let oldest = db
            .insert_record(
                &NewOutboxRecord::new("oldest", "", 1.0).with_created_at(base - Duration::seconds(20)),
            )
            .unwrap();
        let middle = db
            .insert_record(&NewOutboxRecord::new("middle", "", 2.0).with_created_at(base))
            .unwrap();

        let unsent = db.get_unsent_records(10).unwrap();
        let ids: Vec<&str> = unsent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![oldest.id.as_str(), middle.id.as_str(), newest.id.as_str()]);
    }

    #[test]
    fn test_unsent_records_respects_limit() {
        let db = create_test_db();
        let base = Utc::now();

        for i in 0..5 {
            db.insert_record(
                &NewOutboxRecord::new(format!("item-{i}"), "", i as f64)
                    .with_created_at(base + Duration::seconds(i)),
            )
            .unwrap();
        }

        let batch = db.get_unsent_records(3).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].title, "item-0");
        assert_eq!(batch[2].title, "item-2");
    }

    #[test]
    fn test_mark_record_sent_excludes_from_unsent() {
        let db = create_test_db();

        let record = db
            .insert_record(&NewOutboxRecord::new("Widget", "", 1.0))
            .unwrap();
        assert_eq!(db.count_unsent().unwrap(), 1);

        db.mark_record_sent(&record.id).unwrap();

        assert!(db.get_unsent_records(10).unwrap().is_empty());
        assert_eq!(db.count_unsent().unwrap(), 0);
        assert!(db.get_record(&record.id).unwrap().unwrap().sent);
    }

    #[test]
    fn test_mark_record_sent_is_idempotent() {
        let db = create_test_db();

        let record = db
            .insert_record(&NewOutboxRecord::new("Widget", "", 1.0))
            .unwrap();
        db.mark_record_sent(&record.id).unwrap();
        db.mark_record_sent(&record.id).unwrap();

        assert!(db.get_record(&record.id).unwrap().unwrap().sent);
    }

    #[test]
    fn test_mark_missing_record_errors() {
        let db = create_test_db();

        let err = db.mark_record_sent("no-such-id").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[test]
    fn test_created_at_round_trips() {
        let db = create_test_db();
        let pinned = Utc::now() - Duration::days(3);

        let record = db
            .insert_record(&NewOutboxRecord::new("Widget", "", 1.0).with_created_at(pinned))
            .unwrap();
        let fetched = db.get_record(&record.id).unwrap().unwrap();

        assert_eq!(fetched.created_at, pinned);
    }

    #[test]
    fn test_parse_tolerates_bare_timestamp() {
        let db = create_test_db();

        // Simulate a row written by a producer that stores bare UTC timestamps
        db.connection()
            .execute(
                "INSERT INTO outbox_items (id, title, description, price, created_at, sent)
                 VALUES ('legacy', 'Legacy', '', 0.5, '2024-03-01 12:30:00', 0)",
                [],
            )
            .unwrap();

        let record = db.get_record("legacy").unwrap().unwrap();
        assert_eq!(record.created_at.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }
}
