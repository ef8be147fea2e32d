//! Drives photos from Pending to Synced against the tenant's remote deployment.
//!
//! Every upload attempt is recorded as one sync event. Attempts for one photo
//! run strictly one after another with the configured delays in between;
//! batches overlap up to `max_concurrent` photos.

use crate::config::{BatchSettings, RetryPolicy};
use crate::database::{now_millis, Database};
use crate::error::AppError;
use crate::models::{Photo, RemoteInstance, SyncEvent, SyncEventStatus, SyncEventType};
use crate::services::{event_service, instance_service, photo_service, ClientRegistry};
use remote_client::{PhotoRemote, UploadReceipt};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

const NO_RESULT_ERROR: &str = "Upload failed: remote returned no result";
const INTERRUPTED_ERROR: &str = "Sync interrupted";

/// Cheap to clone; clones share the store and the client registry
#[derive(Clone)]
pub struct SyncCoordinator {
    db: Database,
    registry: Arc<ClientRegistry>,
    retry: RetryPolicy,
    batch: BatchSettings,
}

enum AttemptOutcome {
    Uploaded(UploadReceipt),
    Failed(String),
}

impl SyncCoordinator {
    pub fn new(
        db: Database,
        registry: Arc<ClientRegistry>,
        retry: RetryPolicy,
        batch: BatchSettings,
    ) -> Self {
        Self {
            db,
            registry,
            retry,
            batch,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn batch_settings(&self) -> &BatchSettings {
        &self.batch
    }

    /// Syncs one photo, retrying transient failures.
    ///
    /// Returns false without touching the photo when it does not exist, is
    /// not Pending, or its tenant has no active instance.
    pub async fn sync_photo(&self, photo_id: &str) -> bool {
        match self.try_sync_photo(photo_id).await {
            Ok(synced) => synced,
            Err(e) => {
                log::error!("Critical sync error for photo {}: {}", photo_id, e);
                false
            }
        }
    }

    async fn try_sync_photo(&self, photo_id: &str) -> Result<bool, AppError> {
        let Some(photo) = self.db.with(|conn| photo_service::find_photo(conn, photo_id))? else {
            log::error!("Photo not found: {}", photo_id);
            return Ok(false);
        };

        let Some(instance) = self
            .db
            .with(|conn| instance_service::find_active_instance(conn, &photo.tenant_id))?
        else {
            log::error!("No active remote instance for tenant: {}", photo.tenant_id);
            return Ok(false);
        };

        let client = self
            .registry
            .get_client_for_tenant(&photo.tenant_id, &instance.client_config())?;

        if !self.db.with(|conn| photo_service::claim_for_sync(conn, photo_id))? {
            log::warn!(
                "Photo {} is {} and not pending, skipping sync",
                photo_id,
                photo.sync_status
            );
            return Ok(false);
        }

        match self.run_attempts(&photo, &instance, client).await {
            Ok(synced) => Ok(synced),
            Err(e) => {
                // keep the state machine consistent when the store failed mid-run
                let message = format!("Sync aborted: {}", e);
                if let Err(mark_err) =
                    self.db.with(|conn| photo_service::mark_failed(conn, photo_id, &message))
                {
                    log::error!("Could not mark photo {} failed: {}", photo_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn run_attempts(
        &self,
        photo: &Photo,
        instance: &RemoteInstance,
        client: Arc<dyn PhotoRemote>,
    ) -> Result<bool, AppError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::from(NO_RESULT_ERROR);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_after(attempt - 1);
                log::warn!(
                    "Sync attempt {} failed for photo {}, retrying in {}s",
                    attempt,
                    photo.id,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }

            let event = SyncEvent::new(
                &photo.id,
                &instance.id,
                SyncEventType::Upload,
                json!({
                    "filename": photo.filename,
                    "file_path": photo.original_path,
                    "attempt": attempt + 1,
                }),
            );
            self.db.with(|conn| {
                event_service::create_sync_event(conn, &event)?;
                event_service::mark_processing(conn, &event.id)?;
                photo_service::record_sync_attempt(conn, &photo.id)
            })?;

            let start = Instant::now();
            let outcome = upload_attempt(client.clone(), photo).await;
            let processing_time_ms = start.elapsed().as_millis() as i64;

            match outcome {
                AttemptOutcome::Uploaded(receipt) => {
                    let discarded = format!(
                        "Photo {} is no longer syncing, upload result discarded",
                        photo.id
                    );
                    let recorded = self.db.with(|conn| {
                        let recorded = photo_service::mark_synced(
                            conn,
                            &photo.id,
                            receipt.uuid.as_deref(),
                            receipt.filename.as_deref(),
                        )?;
                        let (status, error) = if recorded {
                            (SyncEventStatus::Success, None)
                        } else {
                            (SyncEventStatus::Failed, Some(discarded.as_str()))
                        };
                        event_service::complete_event(
                            conn,
                            &event.id,
                            status,
                            processing_time_ms,
                            error,
                        )?;
                        Ok(recorded)
                    })?;
                    if !recorded {
                        // someone else moved the photo out of Syncing meanwhile
                        log::error!("{}", discarded);
                        return Ok(false);
                    }
                    log::info!("Photo synced successfully: {}", photo.id);
                    return Ok(true);
                }
                AttemptOutcome::Failed(error) => {
                    self.db.with(|conn| {
                        event_service::complete_event(
                            conn,
                            &event.id,
                            SyncEventStatus::Failed,
                            processing_time_ms,
                            Some(&error),
                        )
                    })?;
                    last_error = error;
                }
            }
        }

        self.db
            .with(|conn| photo_service::mark_failed(conn, &photo.id, &last_error))?;
        log::error!(
            "Photo sync failed after {} attempts: {} - {}",
            max_attempts,
            photo.id,
            last_error
        );
        Ok(false)
    }

    /// Syncs many photos with at most `max_concurrent` in flight.
    ///
    /// One entry per distinct input id; a failing or panicking sync only
    /// affects its own entry.
    pub async fn batch_sync_photos(
        &self,
        photo_ids: &[String],
        max_concurrent: usize,
    ) -> HashMap<String, bool> {
        let max_concurrent = max_concurrent.max(1);
        let mut seen = HashSet::new();
        let unique: Vec<String> = photo_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut results: HashMap<String, bool> =
            unique.iter().map(|id| (id.clone(), false)).collect();
        let mut join_set = JoinSet::new();

        for photo_id in unique {
            while join_set.len() >= max_concurrent {
                if let Some(result) = join_set.join_next().await {
                    collect_batch_result(&mut results, result);
                }
            }

            let coordinator = self.clone();
            join_set.spawn(async move {
                let synced = coordinator.sync_photo(&photo_id).await;
                (photo_id, synced)
            });
        }

        while let Some(result) = join_set.join_next().await {
            collect_batch_result(&mut results, result);
        }

        let synced = results.values().filter(|ok| **ok).count();
        log::info!("Batch sync finished: {} of {} photos synced", synced, results.len());
        results
    }

    /// Resets up to `limit` failed photos of the tenant to Pending and syncs
    /// them again. Returns the ids that were retried, whatever the outcome.
    pub async fn retry_failed_syncs(&self, tenant_id: &str, limit: usize) -> Vec<String> {
        let photo_ids = match self.db.with(|conn| {
            let ids = photo_service::find_failed_ids(conn, tenant_id, limit)?;
            photo_service::reset_failed_to_pending(conn, &ids)?;
            Ok(ids)
        }) {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("Error retrying failed syncs for tenant {}: {}", tenant_id, e);
                return Vec::new();
            }
        };

        if !photo_ids.is_empty() {
            log::info!("Retrying {} failed photos for tenant {}", photo_ids.len(), tenant_id);
            self.batch_sync_photos(&photo_ids, self.batch.max_concurrent)
                .await;
        }
        photo_ids
    }

    /// Fails photos of the tenant stuck in Syncing for longer than
    /// `older_than`, e.g. after a crash or a cancelled sync, and closes their
    /// open events. Returns the recovered ids.
    pub fn recover_stale_syncs(&self, tenant_id: &str, older_than: Duration) -> Vec<String> {
        let cutoff = now_millis() - older_than.as_millis() as i64;
        let recovered = self.db.with(|conn| {
            let mut recovered = Vec::new();
            for id in photo_service::find_stale_syncing_ids(conn, tenant_id, cutoff)? {
                if photo_service::mark_failed(conn, &id, INTERRUPTED_ERROR)? {
                    event_service::abandon_open_events(conn, &id, INTERRUPTED_ERROR)?;
                    recovered.push(id);
                }
            }
            Ok(recovered)
        });

        match recovered {
            Ok(ids) => {
                if !ids.is_empty() {
                    log::warn!(
                        "Recovered {} interrupted syncs for tenant {}",
                        ids.len(),
                        tenant_id
                    );
                }
                ids
            }
            Err(e) => {
                log::error!("Error recovering stale syncs for tenant {}: {}", tenant_id, e);
                Vec::new()
            }
        }
    }

    /// Syncs photos left in Pending, e.g. after a crash between the local
    /// insert and the upload, or after an orphan reset.
    pub async fn sync_pending_photos(&self, tenant_id: &str, limit: usize) -> HashMap<String, bool> {
        match self
            .db
            .with(|conn| photo_service::find_pending_ids(conn, tenant_id, limit))
        {
            Ok(ids) if ids.is_empty() => HashMap::new(),
            Ok(ids) => self.batch_sync_photos(&ids, self.batch.max_concurrent).await,
            Err(e) => {
                log::error!("Error loading pending photos for tenant {}: {}", tenant_id, e);
                HashMap::new()
            }
        }
    }
}

/// Runs the upload in its own task so a panic in the client layer only
/// fails this attempt.
async fn upload_attempt(client: Arc<dyn PhotoRemote>, photo: &Photo) -> AttemptOutcome {
    let path = PathBuf::from(&photo.original_path);
    let filename = photo.filename.clone();
    let task = tokio::spawn(async move { client.upload_photo(&path, &filename).await });

    match task.await {
        Ok(Some(receipt)) => AttemptOutcome::Uploaded(receipt),
        Ok(None) => AttemptOutcome::Failed(NO_RESULT_ERROR.to_string()),
        Err(e) => AttemptOutcome::Failed(format!("Upload error: {}", e)),
    }
}

fn collect_batch_result(
    results: &mut HashMap<String, bool>,
    result: Result<(String, bool), tokio::task::JoinError>,
) {
    match result {
        Ok((photo_id, synced)) => {
            results.insert(photo_id, synced);
        }
        Err(e) => log::error!("Batch sync error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use crate::test_support::{
        load_photo, registry_with, seed_failed_photo, seed_instance, seed_photo,
        seed_synced_photo, FakeRemote, UploadOutcome,
    };

    fn coordinator(fake: Arc<FakeRemote>) -> SyncCoordinator {
        SyncCoordinator::new(
            Database::open_in_memory().unwrap(),
            registry_with(fake),
            RetryPolicy::default(),
            BatchSettings::default(),
        )
    }

    fn events(coordinator: &SyncCoordinator, photo_id: &str) -> Vec<SyncEvent> {
        coordinator
            .database()
            .with(|conn| event_service::list_events_for_photo(conn, photo_id))
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let fake = Arc::new(FakeRemote::new());
        fake.script(&[UploadOutcome::Fail, UploadOutcome::Fail, UploadOutcome::Succeed]);
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        assert!(coordinator.sync_photo(&photo.id).await);

        let photo = load_photo(coordinator.database(), &photo.id);
        assert_eq!(photo.sync_status, SyncStatus::Synced);
        assert_eq!(photo.sync_version, 2);
        assert_eq!(photo.remote_uuid.as_deref(), Some("pq-IMG_1.jpg"));
        assert_eq!(photo.remote_filename.as_deref(), Some("IMG_1.jpg"));
        assert!(photo.last_sync_attempt.is_some());

        let events = events(&coordinator, &photo.id);
        let statuses: Vec<SyncEventStatus> = events.iter().map(|e| e.event_status).collect();
        assert_eq!(
            statuses,
            vec![
                SyncEventStatus::Failed,
                SyncEventStatus::Failed,
                SyncEventStatus::Success
            ]
        );
        assert!(events.iter().all(|e| e.event_type == SyncEventType::Upload));
        assert!(events.iter().all(|e| e.processing_time_ms.is_some()));
        assert_eq!(events[2].payload["attempt"], 3);

        assert_eq!(fake.upload_gaps_secs(), vec![5, 15]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_all_attempts() {
        let fake = Arc::new(FakeRemote::new());
        fake.script(&[UploadOutcome::Fail, UploadOutcome::Fail, UploadOutcome::Fail]);
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        assert!(!coordinator.sync_photo(&photo.id).await);

        let photo = load_photo(coordinator.database(), &photo.id);
        assert_eq!(photo.sync_status, SyncStatus::Failed);
        assert_eq!(photo.sync_version, 1);
        assert_eq!(photo.sync_errors, vec![NO_RESULT_ERROR.to_string()]);
        assert!(photo.remote_uuid.is_none());

        let events = events(&coordinator, &photo.id);
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| e.event_status == SyncEventStatus::Failed && e.error_details.is_some()));
        assert_eq!(fake.upload_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_client_counts_as_failed_attempt() {
        let fake = Arc::new(FakeRemote::new());
        fake.script(&[UploadOutcome::Panic, UploadOutcome::Succeed]);
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        assert!(coordinator.sync_photo(&photo.id).await);

        let events = events(&coordinator, &photo.id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_status, SyncEventStatus::Failed);
        assert!(events[0]
            .error_details
            .as_deref()
            .unwrap()
            .starts_with("Upload error"));
        assert_eq!(fake.upload_gaps_secs(), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_schedule_reuses_last_entry() {
        let fake = Arc::new(FakeRemote::new());
        fake.script(&[UploadOutcome::Fail; 5]);
        let coordinator = SyncCoordinator::new(
            Database::open_in_memory().unwrap(),
            registry_with(fake.clone()),
            RetryPolicy {
                max_attempts: 5,
                delays_secs: vec![5, 15, 60],
            },
            BatchSettings::default(),
        );
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        let started = Instant::now();
        assert!(!coordinator.sync_photo(&photo.id).await);

        assert_eq!(fake.upload_gaps_secs(), vec![5, 15, 60, 60]);
        // no delay before the first or after the last attempt
        assert_eq!(started.elapsed().as_secs(), 140);
    }

    #[tokio::test]
    async fn test_missing_photo_fails_fast() {
        let fake = Arc::new(FakeRemote::new());
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");

        assert!(!coordinator.sync_photo("does-not-exist").await);
        assert!(events(&coordinator, "does-not-exist").is_empty());
        assert_eq!(fake.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_no_active_instance_is_not_retried() {
        let fake = Arc::new(FakeRemote::new());
        let coordinator = coordinator(fake.clone());
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        assert!(!coordinator.sync_photo(&photo.id).await);

        assert_eq!(fake.upload_count(), 0);
        assert!(events(&coordinator, &photo.id).is_empty());
        assert_eq!(
            load_photo(coordinator.database(), &photo.id).sync_status,
            SyncStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_non_pending_photos_are_refused() {
        let fake = Arc::new(FakeRemote::new());
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let synced = seed_synced_photo(coordinator.database(), "school-1", "a.jpg", "pq-a");
        let failed = seed_failed_photo(coordinator.database(), "school-1", "b.jpg");

        assert!(!coordinator.sync_photo(&synced.id).await);
        assert!(!coordinator.sync_photo(&failed.id).await);

        assert_eq!(fake.upload_count(), 0);
        assert_eq!(load_photo(coordinator.database(), &synced.id).sync_version, 2);
        assert_eq!(
            load_photo(coordinator.database(), &failed.id).sync_status,
            SyncStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_respects_concurrency_limit() {
        let fake = Arc::new(FakeRemote::new());
        fake.set_latency(Duration::from_millis(200));
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let ids: Vec<String> = (0..12)
            .map(|i| seed_photo(coordinator.database(), "school-1", &format!("{}.jpg", i)).id)
            .collect();

        let results = coordinator.batch_sync_photos(&ids, 3).await;

        assert_eq!(results.len(), 12);
        assert!(results.values().all(|ok| *ok));
        assert_eq!(fake.max_in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_isolates_failures() {
        let fake = Arc::new(FakeRemote::new());
        fake.fail_file("bad.jpg");
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let good = seed_photo(coordinator.database(), "school-1", "good.jpg");
        let bad = seed_photo(coordinator.database(), "school-1", "bad.jpg");

        let ids = vec![
            good.id.clone(),
            bad.id.clone(),
            "missing".to_string(),
            good.id.clone(),
        ];
        let results = coordinator.batch_sync_photos(&ids, 5).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[&good.id], true);
        assert_eq!(results[&bad.id], false);
        assert_eq!(results["missing"], false);
        assert_eq!(
            load_photo(coordinator.database(), &good.id).sync_status,
            SyncStatus::Synced
        );
        assert_eq!(
            load_photo(coordinator.database(), &bad.id).sync_status,
            SyncStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failed_syncs_resets_and_resyncs() {
        let fake = Arc::new(FakeRemote::new());
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let failed: Vec<Photo> = (0..3)
            .map(|i| seed_failed_photo(coordinator.database(), "school-1", &format!("{}.jpg", i)))
            .collect();
        seed_failed_photo(coordinator.database(), "school-2", "other.jpg");

        let retried = coordinator.retry_failed_syncs("school-1", 2).await;

        assert_eq!(retried.len(), 2);
        for photo in &failed {
            let photo = load_photo(coordinator.database(), &photo.id);
            if retried.contains(&photo.id) {
                assert_eq!(photo.sync_status, SyncStatus::Synced);
                assert_eq!(photo.sync_version, 2);
            } else {
                assert_eq!(photo.sync_status, SyncStatus::Failed);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_reports_ids_even_when_retry_fails() {
        let fake = Arc::new(FakeRemote::new());
        fake.fail_file("0.jpg");
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_failed_photo(coordinator.database(), "school-1", "0.jpg");

        let retried = coordinator.retry_failed_syncs("school-1", 10).await;

        assert_eq!(retried, vec![photo.id.clone()]);
        let photo = load_photo(coordinator.database(), &photo.id);
        assert_eq!(photo.sync_status, SyncStatus::Failed);
        assert_eq!(photo.sync_errors.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_is_recovered_and_retried() {
        let fake = Arc::new(FakeRemote::new());
        fake.set_latency(Duration::from_secs(10));
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        let ids = vec![photo.id.clone()];
        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), coordinator.batch_sync_photos(&ids, 5))
                .await;
        assert!(cancelled.is_err());
        assert_eq!(
            load_photo(coordinator.database(), &photo.id).sync_status,
            SyncStatus::Syncing
        );

        // recent claims are left alone
        assert!(coordinator
            .recover_stale_syncs("school-1", Duration::from_secs(3600))
            .is_empty());

        let recovered = coordinator.recover_stale_syncs("school-1", Duration::ZERO);
        assert_eq!(recovered, vec![photo.id.clone()]);

        let stuck = load_photo(coordinator.database(), &photo.id);
        assert_eq!(stuck.sync_status, SyncStatus::Failed);
        assert_eq!(stuck.sync_errors, vec![INTERRUPTED_ERROR.to_string()]);
        let status = crate::services::get_sync_status(coordinator.database(), "school-1").unwrap();
        assert_eq!(status.active_sync_jobs, 0);
        let events = events(&coordinator, &photo.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_status, SyncEventStatus::Failed);
        assert_eq!(events[0].error_details.as_deref(), Some(INTERRUPTED_ERROR));

        assert_eq!(coordinator.retry_failed_syncs("school-1", 10).await, vec![photo.id.clone()]);
        assert_eq!(
            load_photo(coordinator.database(), &photo.id).sync_status,
            SyncStatus::Synced
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_finishing_after_recovery_is_discarded() {
        let fake = Arc::new(FakeRemote::new());
        fake.set_latency(Duration::from_secs(10));
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        let photo = seed_photo(coordinator.database(), "school-1", "IMG_1.jpg");

        let running = {
            let coordinator = coordinator.clone();
            let id = photo.id.clone();
            tokio::spawn(async move { coordinator.sync_photo(&id).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            coordinator.recover_stale_syncs("school-1", Duration::ZERO),
            vec![photo.id.clone()]
        );

        assert!(!running.await.unwrap());

        let photo = load_photo(coordinator.database(), &photo.id);
        assert_eq!(photo.sync_status, SyncStatus::Failed);
        assert_eq!(photo.sync_version, 1);
        assert!(photo.remote_uuid.is_none());
        assert_eq!(fake.upload_count(), 1);
        assert!(events(&coordinator, &photo.id)
            .iter()
            .all(|e| e.event_status == SyncEventStatus::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_pending_photos() {
        let fake = Arc::new(FakeRemote::new());
        let coordinator = coordinator(fake.clone());
        seed_instance(coordinator.database(), "school-1");
        seed_photo(coordinator.database(), "school-1", "a.jpg");
        seed_photo(coordinator.database(), "school-1", "b.jpg");
        seed_synced_photo(coordinator.database(), "school-1", "c.jpg", "pq-c");

        let results = coordinator.sync_pending_photos("school-1", 10).await;

        assert_eq!(results.len(), 2);
        assert!(results.values().all(|ok| *ok));
        assert_eq!(fake.upload_count(), 2);
    }
}
