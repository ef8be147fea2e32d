pub mod background_sync;
pub mod client_registry;
pub mod event_service;
pub mod instance_service;
pub mod photo_service;
pub mod reconciliation_service;
pub mod status_service;
pub mod sync_coordinator;

pub use background_sync::{BackgroundSync, SyncWorker};
pub use client_registry::ClientRegistry;
pub use reconciliation_service::{ReconciliationReport, Reconciler};
pub use status_service::{get_sync_status, SyncStats};
pub use sync_coordinator::SyncCoordinator;
