//! Keeps a tenant's local photo records consistent with its remote
//! photo-management deployment: retrying uploads, bounded batch sync,
//! drift reconciliation and status reporting.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;

#[cfg(test)]
mod test_support;

pub use config::SyncConfig;
pub use database::Database;
pub use error::AppError;
