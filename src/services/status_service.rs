use crate::database::Database;
use crate::error::AppError;
use crate::models::SyncStatus;
use crate::services::{event_service, photo_service};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-tenant sync overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStats {
    pub tenant_id: String,
    pub total_photos: i64,
    pub synced_photos: i64,
    pub pending_photos: i64,
    pub syncing_photos: i64,
    pub failed_photos: i64,
    pub orphaned_photos: i64,
    pub synced_percentage: f64,
    pub last_sync: Option<DateTime<Utc>>,
    pub active_sync_jobs: i64,
}

pub fn get_sync_status(db: &Database, tenant_id: &str) -> Result<SyncStats, AppError> {
    db.with(|conn| {
        let counts = photo_service::count_by_status(conn, tenant_id)?;
        let count = |status: SyncStatus| counts.get(&status).copied().unwrap_or(0);
        let total: i64 = counts.values().sum();
        let synced = count(SyncStatus::Synced);

        Ok(SyncStats {
            tenant_id: tenant_id.to_string(),
            total_photos: total,
            synced_photos: synced,
            pending_photos: count(SyncStatus::Pending),
            syncing_photos: count(SyncStatus::Syncing),
            failed_photos: count(SyncStatus::Failed),
            orphaned_photos: count(SyncStatus::Orphaned),
            synced_percentage: synced_percentage(synced, total),
            last_sync: event_service::latest_success_for_tenant(conn, tenant_id)?,
            active_sync_jobs: event_service::count_active_for_tenant(conn, tenant_id)?,
        })
    })
}

fn synced_percentage(synced: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = synced as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
