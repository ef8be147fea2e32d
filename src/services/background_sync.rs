use crate::config::BackgroundSettings;
use crate::error::AppError;
use crate::services::{instance_service, Reconciler, SyncCoordinator};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const SYNC_LOG_CAPACITY: usize = 500;

/// In-memory session log entry (lost on restart)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncLogEntry {
    pub ts_ms: i64,
    pub cycle: u64,
    pub tenants: usize,
    pub photos_recovered: usize,
    pub photos_retried: usize,
    pub photos_synced: usize,
    pub orphans_found: usize,
    pub unhealthy_instances: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    pub tenants: usize,
    pub photos_recovered: usize,
    pub photos_retried: usize,
    pub photos_synced: usize,
    pub orphans_found: usize,
    pub unhealthy_instances: usize,
}

/// Work done by one scheduler cycle, across all tenants with an active
/// instance
pub struct SyncWorker {
    coordinator: SyncCoordinator,
    reconciler: Arc<Reconciler>,
    settings: BackgroundSettings,
}

impl SyncWorker {
    pub fn new(
        coordinator: SyncCoordinator,
        reconciler: Arc<Reconciler>,
        settings: BackgroundSettings,
    ) -> Self {
        Self {
            coordinator,
            reconciler,
            settings,
        }
    }

    fn reconciles_on(&self, cycle: u64) -> bool {
        self.settings.reconcile_every > 0 && cycle % self.settings.reconcile_every == 0
    }

    /// Fails interrupted syncs, retries failed photos, picks up stranded
    /// pending ones, reconciles on every Nth cycle and records instance
    /// health.
    pub async fn perform_sync_cycle(&self, cycle: u64) -> Result<CycleStats, AppError> {
        let db = self.coordinator.database().clone();
        let tenants = db.with(instance_service::list_active_tenants)?;
        let retry_limit = self.coordinator.batch_settings().retry_limit;
        let stale_after = Duration::from_secs(self.settings.stale_sync_secs);
        let mut stats = CycleStats {
            tenants: tenants.len(),
            ..Default::default()
        };

        for tenant_id in &tenants {
            // recovered photos are picked up by the retry below
            stats.photos_recovered += self
                .coordinator
                .recover_stale_syncs(tenant_id, stale_after)
                .len();

            let retried = self.coordinator.retry_failed_syncs(tenant_id, retry_limit).await;
            stats.photos_retried += retried.len();

            let results = self
                .coordinator
                .sync_pending_photos(tenant_id, self.settings.pending_limit)
                .await;
            stats.photos_synced += results.values().filter(|ok| **ok).count();

            if self.reconciles_on(cycle) {
                let report = self
                    .reconciler
                    .reconcile(tenant_id, self.settings.reconcile_dry_run)
                    .await;
                if let Some(error) = &report.error {
                    log::warn!("Scheduled reconciliation for {} failed: {}", tenant_id, error);
                }
                stats.orphans_found += report.orphaned_local.len() + report.orphaned_remote.len();
            }

            // make sure every active tenant is covered by the health sweep
            if let Some(instance) =
                db.with(|conn| instance_service::find_active_instance(conn, tenant_id))?
            {
                self.coordinator
                    .registry()
                    .get_client_for_tenant(tenant_id, &instance.client_config())?;
            }
        }

        let health = self.coordinator.registry().health_check_all().await;
        for tenant_id in &tenants {
            let healthy = health.get(tenant_id).copied().unwrap_or(false);
            if !healthy {
                stats.unhealthy_instances += 1;
            }
            db.with(|conn| instance_service::record_health_check(conn, tenant_id, healthy))?;
        }

        Ok(stats)
    }
}

/// Handle to the running scheduler task.
///
/// Dropping the handle without calling `stop` leaves the task running until
/// the runtime shuts down.
pub struct BackgroundSync {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    log: Arc<Mutex<Vec<SyncLogEntry>>>,
}

impl BackgroundSync {
    /// Spawns the scheduler; the first cycle runs immediately
    pub fn start(worker: SyncWorker) -> Self {
        let interval = Duration::from_secs(worker.settings.interval_secs.max(1));
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let log = Arc::new(Mutex::new(Vec::new()));

        log::info!(
            "Starting background sync with {} second interval",
            interval.as_secs()
        );

        let task_log = log.clone();
        let handle = tokio::spawn(async move {
            let mut cycle: u64 = 0;
            loop {
                cycle += 1;
                match worker.perform_sync_cycle(cycle).await {
                    Ok(stats) => {
                        log::info!("Background sync cycle {} completed: {:?}", cycle, stats);
                        append_log(
                            &task_log,
                            SyncLogEntry {
                                ts_ms: Utc::now().timestamp_millis(),
                                cycle,
                                tenants: stats.tenants,
                                photos_recovered: stats.photos_recovered,
                                photos_retried: stats.photos_retried,
                                photos_synced: stats.photos_synced,
                                orphans_found: stats.orphans_found,
                                unhealthy_instances: stats.unhealthy_instances,
                            },
                        );
                    }
                    Err(e) => log::error!("Background sync error: {}", e),
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop_rx.changed() => break,
                }
            }
            log::info!("Background sync stopped");
        });

        Self {
            stop_tx,
            handle,
            log,
        }
    }

    /// Signals the loop and waits for the running cycle to finish
    pub async fn stop(self) {
        log::info!("Stopping background sync");
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            log::error!("Background sync task ended abnormally: {}", e);
        }
    }

    /// Entries of the cycles run so far, oldest first
    pub fn sync_log(&self) -> Vec<SyncLogEntry> {
        self.log.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

fn append_log(log: &Mutex<Vec<SyncLogEntry>>, entry: SyncLogEntry) {
    if let Ok(mut guard) = log.lock() {
        guard.push(entry);
        let len = guard.len();
        if len > SYNC_LOG_CAPACITY {
            guard.drain(0..len - SYNC_LOG_CAPACITY);
        }
    }
}
