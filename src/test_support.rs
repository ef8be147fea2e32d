//! Instrumented fake remote and store seeding helpers for unit tests

use crate::database::Database;
use crate::models::{Photo, RemoteInstance};
use crate::services::{instance_service, photo_service, ClientRegistry};
use async_trait::async_trait;
use remote_client::{InstanceConfig, PhotoRemote, RemotePhoto, UploadReceipt};
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UploadOutcome {
    Succeed,
    Fail,
    Panic,
}

/// Remote double with scripted upload outcomes.
///
/// Uploads consume `script` front to back; once it is empty every upload
/// succeeds unless its filename is in the fail set.
pub(crate) struct FakeRemote {
    script: Mutex<VecDeque<UploadOutcome>>,
    failing_files: Mutex<HashSet<String>>,
    upload_times: Mutex<Vec<Instant>>,
    upload_latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    remote_photos: Mutex<Option<Vec<RemotePhoto>>>,
    healthy: AtomicBool,
    health_panics: AtomicBool,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            failing_files: Mutex::new(HashSet::new()),
            upload_times: Mutex::new(Vec::new()),
            upload_latency: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            remote_photos: Mutex::new(Some(Vec::new())),
            healthy: AtomicBool::new(true),
            health_panics: AtomicBool::new(false),
        }
    }

    pub(crate) fn script(&self, outcomes: &[UploadOutcome]) {
        self.script.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub(crate) fn fail_file(&self, filename: &str) {
        self.failing_files.lock().unwrap().insert(filename.to_string());
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.upload_latency.lock().unwrap() = latency;
    }

    pub(crate) fn set_remote_photos(&self, photos: Option<Vec<RemotePhoto>>) {
        *self.remote_photos.lock().unwrap() = photos;
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub(crate) fn set_health_panics(&self, panics: bool) {
        self.health_panics.store(panics, Ordering::SeqCst);
    }

    pub(crate) fn upload_times(&self) -> Vec<Instant> {
        self.upload_times.lock().unwrap().clone()
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.upload_times.lock().unwrap().len()
    }

    /// Whole seconds between consecutive upload calls
    pub(crate) fn upload_gaps_secs(&self) -> Vec<u64> {
        self.upload_times()
            .windows(2)
            .map(|w| w[1].duration_since(w[0]).as_secs())
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoRemote for FakeRemote {
    async fn authenticate(&self) -> bool {
        true
    }

    async fn ensure_session(&self) -> bool {
        true
    }

    async fn upload_photo(&self, _path: &Path, filename: &str) -> Option<UploadReceipt> {
        self.upload_times.lock().unwrap().push(Instant::now());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let latency = *self.upload_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None if self.failing_files.lock().unwrap().contains(filename) => UploadOutcome::Fail,
            None => UploadOutcome::Succeed,
        };

        match outcome {
            UploadOutcome::Succeed => Some(UploadReceipt {
                uuid: Some(format!("pq-{}", filename)),
                filename: Some(filename.to_string()),
                extra: Map::new(),
            }),
            UploadOutcome::Fail => None,
            UploadOutcome::Panic => panic!("fake remote exploded while uploading {}", filename),
        }
    }

    async fn search_photos(
        &self,
        _query: &str,
        count: u32,
        offset: u32,
    ) -> Option<Vec<RemotePhoto>> {
        self.remote_photos.lock().unwrap().clone().map(|photos| {
            photos
                .into_iter()
                .skip(offset as usize)
                .take(count as usize)
                .collect()
        })
    }

    async fn get_photo_metadata(&self, uuid: &str) -> Option<Map<String, Value>> {
        let photos = self.remote_photos.lock().unwrap().clone()?;
        photos
            .into_iter()
            .find(|p| p.uuid.as_deref() == Some(uuid))
            .map(|p| p.extra)
    }

    async fn health_check(&self) -> bool {
        if self.health_panics.load(Ordering::SeqCst) {
            panic!("fake remote health probe exploded");
        }
        self.healthy.load(Ordering::SeqCst)
    }

    async fn trigger_indexing(&self) -> bool {
        true
    }
}

/// Registry handing out `fake` for every tenant
pub(crate) fn registry_with(fake: Arc<FakeRemote>) -> Arc<ClientRegistry> {
    Arc::new(ClientRegistry::with_connector(Arc::new(
        move |_cfg: &InstanceConfig| Ok(fake.clone() as Arc<dyn PhotoRemote>),
    )))
}

pub(crate) fn seed_instance(db: &Database, tenant_id: &str) -> RemoteInstance {
    let instance = RemoteInstance::new(tenant_id, "http://photos.invalid", "admin", "secret");
    db.with(|conn| instance_service::create_instance(conn, &instance))
        .unwrap();
    instance
}

pub(crate) fn seed_photo(db: &Database, tenant_id: &str, filename: &str) -> Photo {
    let photo = Photo::new(tenant_id, filename, &format!("/uploads/{}", filename));
    db.with(|conn| photo_service::create_photo(conn, &photo))
        .unwrap();
    photo
}

pub(crate) fn seed_synced_photo(
    db: &Database,
    tenant_id: &str,
    filename: &str,
    remote_uuid: &str,
) -> Photo {
    let photo = seed_photo(db, tenant_id, filename);
    db.with(|conn| {
        photo_service::claim_for_sync(conn, &photo.id)?;
        photo_service::mark_synced(conn, &photo.id, Some(remote_uuid), Some(filename))
    })
    .unwrap();
    load_photo(db, &photo.id)
}

pub(crate) fn seed_failed_photo(db: &Database, tenant_id: &str, filename: &str) -> Photo {
    let photo = seed_photo(db, tenant_id, filename);
    db.with(|conn| {
        photo_service::claim_for_sync(conn, &photo.id)?;
        photo_service::mark_failed(conn, &photo.id, "seeded failure")
    })
    .unwrap();
    load_photo(db, &photo.id)
}

pub(crate) fn load_photo(db: &Database, photo_id: &str) -> Photo {
    db.with(|conn| photo_service::find_photo(conn, photo_id))
        .unwrap()
        .unwrap()
}
