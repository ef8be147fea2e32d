use crate::models::{RemotePhoto, UploadReceipt};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;

/// Operations the sync layer needs from a remote deployment.
///
/// Implementations never return errors: a failed call yields `None` or
/// `false` and logs the cause.
#[async_trait]
pub trait PhotoRemote: Send + Sync {
    /// Exchange credentials for a fresh session token.
    async fn authenticate(&self) -> bool;

    /// Reuse the cached token while it is fresh, otherwise authenticate.
    async fn ensure_session(&self) -> bool;

    async fn upload_photo(&self, path: &Path, filename: &str) -> Option<UploadReceipt>;

    /// Empty `query` lists everything, bounded by `count`.
    async fn search_photos(&self, query: &str, count: u32, offset: u32)
        -> Option<Vec<RemotePhoto>>;

    async fn get_photo_metadata(&self, uuid: &str) -> Option<Map<String, Value>>;

    /// Unauthenticated status probe.
    async fn health_check(&self) -> bool;

    async fn trigger_indexing(&self) -> bool;
}
