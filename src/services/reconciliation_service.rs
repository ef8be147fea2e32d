//! Drift detection between the local photo store and a tenant's remote
//! deployment.

use crate::config::ReconcileSettings;
use crate::database::Database;
use crate::error::AppError;
use crate::models::{Photo, SyncEvent, SyncEventStatus, SyncEventType};
use crate::services::{event_service, instance_service, photo_service, ClientRegistry};
use chrono::{DateTime, Utc};
use remote_client::{PhotoRemote, RemotePhoto};
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Local photo whose remote copy no longer exists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanedLocal {
    pub id: String,
    pub filename: String,
    pub remote_uuid: String,
}

/// Remote item with no local record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanedRemote {
    pub uuid: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub tenant_id: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub local_photos: usize,
    pub remote_photos: usize,
    /// False when the remote listing stopped at the configured ceiling
    pub remote_listing_complete: bool,
    pub orphaned_local: Vec<OrphanedLocal>,
    pub orphaned_remote: Vec<OrphanedRemote>,
    pub actions_taken: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationReport {
    fn new(tenant_id: &str, dry_run: bool) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            dry_run,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            local_photos: 0,
            remote_photos: 0,
            remote_listing_complete: false,
            orphaned_local: Vec::new(),
            orphaned_remote: Vec::new(),
            actions_taken: Vec::new(),
            warning: None,
            error: None,
        }
    }

    fn finish(mut self) -> Self {
        let completed_at = Utc::now();
        let elapsed = completed_at - self.started_at;
        self.duration_seconds = Some(elapsed.num_milliseconds() as f64 / 1000.0);
        self.completed_at = Some(completed_at);
        self
    }

    fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.finish()
    }
}

/// Remote photos fetched page by page
struct RemoteListing {
    photos: Vec<RemotePhoto>,
    complete: bool,
}

pub struct Reconciler {
    db: Database,
    registry: Arc<ClientRegistry>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(db: Database, registry: Arc<ClientRegistry>, settings: ReconcileSettings) -> Self {
        Self {
            db,
            registry,
            settings,
        }
    }

    /// Pages through the full remote listing until a short page arrives or
    /// `max_remote_photos` items were fetched. None if any page failed.
    async fn list_remote(&self, client: &dyn PhotoRemote) -> Option<RemoteListing> {
        let page_size = self.settings.remote_page_size.max(1);
        let ceiling = self.settings.max_remote_photos;
        let mut photos = Vec::new();
        let mut offset: u32 = 0;

        while offset < ceiling {
            let count = page_size.min(ceiling - offset);
            let page = client.search_photos("", count, offset).await?;
            let fetched = page.len() as u32;
            photos.extend(page);
            if fetched < count {
                return Some(RemoteListing {
                    photos,
                    complete: true,
                });
            }
            offset += fetched;
        }

        Some(RemoteListing {
            photos,
            complete: false,
        })
    }

    /// Compares the tenant's local photos with the remote listing.
    ///
    /// With `dry_run` nothing is written. Otherwise every orphaned local
    /// photo is reset to Pending; orphaned remote items are only reported.
    pub async fn reconcile(&self, tenant_id: &str, dry_run: bool) -> ReconciliationReport {
        let report = ReconciliationReport::new(tenant_id, dry_run);
        match self.try_reconcile(report.clone(), dry_run).await {
            Ok(report) => {
                log::info!(
                    "Reconciled tenant {}: {} orphaned local, {} orphaned remote, {} actions",
                    tenant_id,
                    report.orphaned_local.len(),
                    report.orphaned_remote.len(),
                    report.actions_taken.len()
                );
                report
            }
            Err(e) => {
                log::error!("Reconciliation failed for tenant {}: {}", tenant_id, e);
                report.with_error(e.to_string())
            }
        }
    }

    async fn try_reconcile(
        &self,
        mut report: ReconciliationReport,
        dry_run: bool,
    ) -> Result<ReconciliationReport, AppError> {
        let tenant_id = report.tenant_id.clone();
        let local = self
            .db
            .with(|conn| photo_service::list_photos_for_tenant(conn, &tenant_id))?;
        report.local_photos = local.len();

        let Some(instance) = self
            .db
            .with(|conn| instance_service::find_active_instance(conn, &tenant_id))?
        else {
            return Ok(report.with_error("No active remote instance found"));
        };

        let client = self
            .registry
            .get_client_for_tenant(&tenant_id, &instance.client_config())?;
        let Some(listing) = self.list_remote(client.as_ref()).await else {
            return Ok(report.with_error("Could not list remote photos"));
        };
        report.remote_photos = listing.photos.len();
        report.remote_listing_complete = listing.complete;

        let (orphaned_local, orphaned_remote) = find_orphans(&local, &listing.photos);
        report.orphaned_local = orphaned_local;
        report.orphaned_remote = orphaned_remote;

        if !listing.complete {
            // local orphans may just be beyond the ceiling
            let warning = format!(
                "Remote listing stopped at {} photos; local orphans were not reset",
                self.settings.max_remote_photos
            );
            log::warn!("Tenant {}: {}", tenant_id, warning);
            report.warning = Some(warning);
        } else if !dry_run {
            for orphan in &report.orphaned_local {
                let reset = self.db.with(|conn| {
                    if !photo_service::reset_orphan(conn, &orphan.id, &orphan.remote_uuid)? {
                        return Ok(false);
                    }
                    let mut event = SyncEvent::new(
                        &orphan.id,
                        &instance.id,
                        SyncEventType::Reconcile,
                        json!({
                            "action": "reset_to_pending",
                            "remote_uuid": orphan.remote_uuid,
                        }),
                    );
                    event.event_status = SyncEventStatus::Success;
                    event.processing_time_ms = Some(0);
                    event_service::create_sync_event(conn, &event)?;
                    Ok(true)
                })?;

                if reset {
                    report
                        .actions_taken
                        .push(format!("Reset photo {} to pending", orphan.id));
                } else {
                    log::debug!("Photo {} changed since listing, not reset", orphan.id);
                }
            }
        }

        Ok(report.finish())
    }
}

/// Splits both sides into orphan lists, keyed by remote uuid
fn find_orphans(
    local: &[Photo],
    remote: &[RemotePhoto],
) -> (Vec<OrphanedLocal>, Vec<OrphanedRemote>) {
    let remote_uuids: HashSet<&str> = remote.iter().filter_map(|p| p.uuid.as_deref()).collect();
    let local_by_uuid: HashMap<&str, &Photo> = local
        .iter()
        .filter_map(|p| p.remote_uuid.as_deref().map(|uuid| (uuid, p)))
        .collect();

    let orphaned_local = local
        .iter()
        .filter_map(|photo| {
            let uuid = photo.remote_uuid.as_deref()?;
            (!remote_uuids.contains(uuid)).then(|| OrphanedLocal {
                id: photo.id.clone(),
                filename: photo.filename.clone(),
                remote_uuid: uuid.to_string(),
            })
        })
        .collect();

    let orphaned_remote = remote
        .iter()
        .filter_map(|item| {
            let uuid = item.uuid.as_deref()?;
            (!local_by_uuid.contains_key(uuid)).then(|| OrphanedRemote {
                uuid: uuid.to_string(),
                filename: item
                    .filename
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        })
        .collect();

    (orphaned_local, orphaned_remote)
}
