use crate::database::{from_millis, now_millis, to_millis};
use crate::error::AppError;
use crate::models::{SyncEvent, SyncEventStatus, SyncEventType};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

fn invalid(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

fn event_from_row(row: &Row) -> rusqlite::Result<SyncEvent> {
    let event_type: String = row.get(3)?;
    let event_status: String = row.get(4)?;
    let payload: String = row.get(5)?;

    Ok(SyncEvent {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        instance_id: row.get(2)?,
        event_type: SyncEventType::parse(&event_type)
            .ok_or_else(|| invalid(3, format!("unknown event_type '{}'", event_type)))?,
        event_status: SyncEventStatus::parse(&event_status)
            .ok_or_else(|| invalid(4, format!("unknown event_status '{}'", event_status)))?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| invalid(5, format!("invalid payload: {}", e)))?,
        error_details: row.get(6)?,
        processing_time_ms: row.get(7)?,
        created_at: from_millis(row.get(8)?),
        updated_at: from_millis(row.get(9)?),
    })
}

/// Appends a new audit event
pub fn create_sync_event(conn: &Connection, event: &SyncEvent) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO sync_events
         (id, photo_id, instance_id, event_type, event_status, payload, error_details,
          processing_time_ms, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.id,
            event.photo_id,
            event.instance_id,
            event.event_type.as_str(),
            event.event_status.as_str(),
            serde_json::to_string(&event.payload)?,
            event.error_details,
            event.processing_time_ms,
            to_millis(event.created_at),
            to_millis(event.updated_at),
        ],
    )?;
    Ok(())
}

pub fn mark_processing(conn: &Connection, event_id: &str) -> Result<(), AppError> {
    conn.execute(
        "UPDATE sync_events SET event_status = 'processing', updated_at = ?1
         WHERE id = ?2 AND event_status = 'pending'",
        params![now_millis(), event_id],
    )?;
    Ok(())
}

/// Closes an event as Success or Failed
pub fn complete_event(
    conn: &Connection,
    event_id: &str,
    status: SyncEventStatus,
    processing_time_ms: i64,
    error_details: Option<&str>,
) -> Result<(), AppError> {
    if status.is_active() {
        return Err(AppError::Validation(format!(
            "cannot complete event with status {}",
            status.as_str()
        )));
    }
    conn.execute(
        "UPDATE sync_events
         SET event_status = ?1, processing_time_ms = ?2, error_details = ?3, updated_at = ?4
         WHERE id = ?5 AND event_status IN ('pending', 'processing')",
        params![
            status.as_str(),
            processing_time_ms,
            error_details,
            now_millis(),
            event_id
        ],
    )?;
    Ok(())
}

/// Fails every event of the photo still Pending or Processing
pub fn abandon_open_events(conn: &Connection, photo_id: &str, reason: &str) -> Result<usize, AppError> {
    let closed = conn.execute(
        "UPDATE sync_events SET event_status = 'failed', error_details = ?1, updated_at = ?2
         WHERE photo_id = ?3 AND event_status IN ('pending', 'processing')",
        params![reason, now_millis(), photo_id],
    )?;
    Ok(closed)
}

/// Audit trail of one photo, oldest first
pub fn list_events_for_photo(conn: &Connection, photo_id: &str) -> Result<Vec<SyncEvent>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, photo_id, instance_id, event_type, event_status, payload, error_details,
                processing_time_ms, created_at, updated_at
         FROM sync_events
         WHERE photo_id = ?1
         ORDER BY created_at, rowid",
    )?;
    let events = stmt
        .query_map(params![photo_id], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Completion time of the tenant's most recent successful upload
pub fn latest_success_for_tenant(
    conn: &Connection,
    tenant_id: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let latest: Option<i64> = conn.query_row(
        "SELECT MAX(e.updated_at)
         FROM sync_events e
         JOIN remote_instances i ON i.id = e.instance_id
         WHERE i.tenant_id = ?1 AND e.event_type = 'upload' AND e.event_status = 'success'",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(latest.map(from_millis))
}

/// Events of the tenant still Pending or Processing
pub fn count_active_for_tenant(conn: &Connection, tenant_id: &str) -> Result<i64, AppError> {
    let count = conn.query_row(
        "SELECT COUNT(*)
         FROM sync_events e
         JOIN remote_instances i ON i.id = e.instance_id
         WHERE i.tenant_id = ?1 AND e.event_status IN ('pending', 'processing')",
        params![tenant_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
