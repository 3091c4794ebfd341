//! Standalone query functions that work with any Connection.
//!
//! Each function takes a `&Connection` as its first parameter so it can run
//! inside `AsyncDatabase::call` or against a synchronous `Database`.

use crate::{DatabaseError, DatabaseResult, NewOutboxRecord, OutboxRecord};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Insert a new outbox record, assigning its id.
pub fn insert_record(conn: &Connection, record: &NewOutboxRecord) -> DatabaseResult<OutboxRecord> {
    let id = Uuid::new_v4().to_string();
    let created_at = record.created_at.unwrap_or_else(Utc::now).to_rfc3339();
    conn.execute(
        "INSERT INTO outbox_items (id, title, description, price, created_at, sent)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![id, record.title, record.description, record.price, created_at],
    )?;
    get_record(conn, &id)?
        .ok_or_else(|| DatabaseError::NotFound("Record not found after insert".to_string()))
}

/// Get an outbox record by ID.
pub fn get_record(conn: &Connection, id: &str) -> DatabaseResult<Option<OutboxRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, title, description, price, created_at, sent
         FROM outbox_items WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], |row| {
        Ok(OutboxRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            created_at: parse_datetime(row.get::<_, String>(4)?),
            sent: row.get(5)?,
        })
    });

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fetch up to `limit` unsent records, oldest first.
pub fn get_unsent_records(conn: &Connection, limit: u32) -> DatabaseResult<Vec<OutboxRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, title, description, price, created_at, sent
         FROM outbox_items WHERE sent = 0
         ORDER BY created_at ASC
         LIMIT ?1",
    )?;

    let records = stmt
        .query_map(params![limit], |row| {
            Ok(OutboxRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                price: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
                sent: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Mark a record as sent.
///
/// Returns `NotFound` when no record has the given id.
pub fn mark_record_sent(conn: &Connection, id: &str) -> DatabaseResult<()> {
    let updated = conn.execute("UPDATE outbox_items SET sent = 1 WHERE id = ?1", params![id])?;
    if updated == 0 {
        return Err(DatabaseError::NotFound(format!(
            "No outbox record with id {id}"
        )));
    }
    Ok(())
}

/// Count records that have not been relayed yet.
pub fn count_unsent(conn: &Connection) -> DatabaseResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outbox_items WHERE sent = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }
    // Rows written by non-Rust producers may carry a bare UTC timestamp
    if let Ok(naive) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
        return naive.and_utc();
    }
    Utc::now()
}
