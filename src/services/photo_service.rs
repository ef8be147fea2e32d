use crate::database::{from_millis, now_millis, to_millis};
use crate::error::AppError;
use crate::models::{Photo, SyncStatus};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const PHOTO_COLUMNS: &str = "id, tenant_id, filename, original_path, sync_status, sync_version,
     remote_uuid, remote_filename, sync_errors, last_sync_attempt, created_at, updated_at";

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

fn photo_from_row(row: &Row) -> rusqlite::Result<Photo> {
    let status: String = row.get(4)?;
    let sync_status = SyncStatus::parse(&status)
        .ok_or_else(|| conversion_error(4, format!("unknown sync_status '{}'", status)))?;
    let errors: String = row.get(8)?;
    let sync_errors: Vec<String> = serde_json::from_str(&errors)
        .map_err(|e| conversion_error(8, format!("invalid sync_errors: {}", e)))?;

    Ok(Photo {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        filename: row.get(2)?,
        original_path: row.get(3)?,
        sync_status,
        sync_version: row.get(5)?,
        remote_uuid: row.get(6)?,
        remote_filename: row.get(7)?,
        sync_errors,
        last_sync_attempt: row.get::<_, Option<i64>>(9)?.map(from_millis),
        created_at: from_millis(row.get(10)?),
        updated_at: from_millis(row.get(11)?),
    })
}

/// Rejects writes that are not an edge of the sync state machine
fn ensure_edge(from: SyncStatus, to: SyncStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "illegal sync transition {} -> {}",
            from, to
        )))
    }
}

/// Inserts a new photo record (done by the upload endpoint)
pub fn create_photo(conn: &Connection, photo: &Photo) -> Result<(), AppError> {
    conn.execute(
        &format!(
            "INSERT INTO photos ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            PHOTO_COLUMNS
        ),
        params![
            photo.id,
            photo.tenant_id,
            photo.filename,
            photo.original_path,
            photo.sync_status.as_str(),
            photo.sync_version,
            photo.remote_uuid,
            photo.remote_filename,
            serde_json::to_string(&photo.sync_errors)?,
            photo.last_sync_attempt.map(to_millis),
            to_millis(photo.created_at),
            to_millis(photo.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_photo(conn: &Connection, photo_id: &str) -> Result<Option<Photo>, AppError> {
    let photo = conn
        .query_row(
            &format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS),
            params![photo_id],
            photo_from_row,
        )
        .optional()?;
    Ok(photo)
}

/// Every photo of a tenant, oldest first
pub fn list_photos_for_tenant(conn: &Connection, tenant_id: &str) -> Result<Vec<Photo>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM photos WHERE tenant_id = ?1 ORDER BY created_at, rowid",
        PHOTO_COLUMNS
    ))?;
    let photos = stmt
        .query_map(params![tenant_id], photo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

fn find_ids_with_status(
    conn: &Connection,
    tenant_id: &str,
    status: SyncStatus,
    limit: usize,
) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM photos
         WHERE tenant_id = ?1 AND sync_status = ?2
         ORDER BY created_at, rowid
         LIMIT ?3",
    )?;
    let ids = stmt
        .query_map(params![tenant_id, status.as_str(), limit as i64], |row| {
            row.get(0)
        })?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn find_failed_ids(
    conn: &Connection,
    tenant_id: &str,
    limit: usize,
) -> Result<Vec<String>, AppError> {
    find_ids_with_status(conn, tenant_id, SyncStatus::Failed, limit)
}

pub fn find_pending_ids(
    conn: &Connection,
    tenant_id: &str,
    limit: usize,
) -> Result<Vec<String>, AppError> {
    find_ids_with_status(conn, tenant_id, SyncStatus::Pending, limit)
}

/// Moves a photo from Pending to Syncing.
///
/// Returns false if the photo was not Pending (e.g. already claimed by a
/// concurrent sync).
pub fn claim_for_sync(conn: &Connection, photo_id: &str) -> Result<bool, AppError> {
    ensure_edge(SyncStatus::Pending, SyncStatus::Syncing)?;
    let changed = conn.execute(
        "UPDATE photos SET sync_status = 'syncing', updated_at = ?1
         WHERE id = ?2 AND sync_status = 'pending'",
        params![now_millis(), photo_id],
    )?;
    Ok(changed == 1)
}

/// Stamps the start of an upload attempt
pub fn record_sync_attempt(conn: &Connection, photo_id: &str) -> Result<(), AppError> {
    let now = now_millis();
    conn.execute(
        "UPDATE photos SET last_sync_attempt = ?1, updated_at = ?1 WHERE id = ?2",
        params![now, photo_id],
    )?;
    Ok(())
}

/// Syncing -> Synced, storing the remote identity and bumping the version
pub fn mark_synced(
    conn: &Connection,
    photo_id: &str,
    remote_uuid: Option<&str>,
    remote_filename: Option<&str>,
) -> Result<bool, AppError> {
    ensure_edge(SyncStatus::Syncing, SyncStatus::Synced)?;
    let changed = conn.execute(
        "UPDATE photos
         SET sync_status = 'synced', remote_uuid = ?1, remote_filename = ?2,
             sync_version = sync_version + 1, updated_at = ?3
         WHERE id = ?4 AND sync_status = 'syncing'",
        params![remote_uuid, remote_filename, now_millis(), photo_id],
    )?;
    Ok(changed == 1)
}

/// Syncing -> Failed, appending `error` to the photo's error list
pub fn mark_failed(conn: &Connection, photo_id: &str, error: &str) -> Result<bool, AppError> {
    ensure_edge(SyncStatus::Syncing, SyncStatus::Failed)?;
    let current: Option<String> = conn
        .query_row(
            "SELECT sync_errors FROM photos WHERE id = ?1 AND sync_status = 'syncing'",
            params![photo_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Ok(false);
    };

    let mut errors: Vec<String> = serde_json::from_str(&current)?;
    errors.push(error.to_string());

    let changed = conn.execute(
        "UPDATE photos SET sync_status = 'failed', sync_errors = ?1, updated_at = ?2
         WHERE id = ?3 AND sync_status = 'syncing'",
        params![serde_json::to_string(&errors)?, now_millis(), photo_id],
    )?;
    Ok(changed == 1)
}

/// Syncing photos of a tenant untouched since `cutoff_ms`.
///
/// A live sync stamps the photo before every attempt, so these are claims
/// whose sync was dropped or crashed.
pub fn find_stale_syncing_ids(
    conn: &Connection,
    tenant_id: &str,
    cutoff_ms: i64,
) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM photos
         WHERE tenant_id = ?1 AND sync_status = 'syncing' AND updated_at <= ?2
         ORDER BY created_at, rowid",
    )?;
    let ids = stmt
        .query_map(params![tenant_id, cutoff_ms], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Failed -> Pending for every listed photo that is still Failed
pub fn reset_failed_to_pending(conn: &Connection, photo_ids: &[String]) -> Result<usize, AppError> {
    ensure_edge(SyncStatus::Failed, SyncStatus::Pending)?;
    let now = now_millis();
    let mut stmt = conn.prepare(
        "UPDATE photos SET sync_status = 'pending', updated_at = ?1
         WHERE id = ?2 AND sync_status = 'failed'",
    )?;
    let mut reset = 0;
    for id in photo_ids {
        reset += stmt.execute(params![now, id])?;
    }
    Ok(reset)
}

/// Synced -> Pending for a photo whose remote copy vanished.
///
/// Only applies while the stored remote uuid still equals `remote_uuid`.
pub fn reset_orphan(conn: &Connection, photo_id: &str, remote_uuid: &str) -> Result<bool, AppError> {
    ensure_edge(SyncStatus::Synced, SyncStatus::Pending)?;
    let changed = conn.execute(
        "UPDATE photos
         SET sync_status = 'pending', remote_uuid = NULL, remote_filename = NULL, updated_at = ?1
         WHERE id = ?2 AND sync_status = 'synced' AND remote_uuid = ?3",
        params![now_millis(), photo_id, remote_uuid],
    )?;
    Ok(changed == 1)
}

/// Photo counts per status for one tenant
pub fn count_by_status(
    conn: &Connection,
    tenant_id: &str,
) -> Result<HashMap<SyncStatus, i64>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT sync_status, COUNT(*) FROM photos WHERE tenant_id = ?1 GROUP BY sync_status",
    )?;
    let rows = stmt
        .query_map(params![tenant_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = HashMap::new();
    for (status, count) in rows {
        match SyncStatus::parse(&status) {
            Some(s) => {
                counts.insert(s, count);
            }
            None => log::warn!("Ignoring unknown sync_status '{}' in counts", status),
        }
    }
    Ok(counts)
}
