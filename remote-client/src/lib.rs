//! # Remote Client
//!
//! HTTP client for one deployment of the remote photo-management service
//! (PhotoPrism-compatible API).
//!
//! This crate provides:
//! - Session authentication with a cached, expiring token
//! - Multipart photo upload
//! - Photo search and metadata lookup
//! - Unauthenticated health probe and index trigger
//!
//! ## Failure model
//!
//! Every public operation returns a sentinel (`None` / `false`) instead of an
//! error. Causes are logged. Callers treat "could not reach the remote" the
//! same way regardless of whether authentication, the network or the server
//! failed.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use remote_client::{InstanceConfig, PhotoRemote, RemoteClient};
//!
//! let client = RemoteClient::new(InstanceConfig {
//!     base_url: "https://photos.example.org".to_string(),
//!     username: "admin".to_string(),
//!     password: "secret".to_string(),
//! })?;
//!
//! if let Some(receipt) = client.upload_photo(path, "IMG_0001.jpg").await {
//!     println!("stored as {:?}", receipt.uuid);
//! }
//! ```

pub mod api;
pub mod models;
pub mod service;

pub use api::PhotoRemote;
pub use models::{InstanceConfig, RemotePhoto, Session, SessionResponse, UploadReceipt};
pub use service::{ClientError, RemoteClient};
