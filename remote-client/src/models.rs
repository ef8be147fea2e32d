use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Connection settings for one remote deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/v1/session`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from the session endpoint; `id` is the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
}

/// Cached session token
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Decoded response of a successful upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default, alias = "UID")]
    pub uuid: Option<String>,
    #[serde(default, alias = "FileName")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One item of the remote photo listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePhoto {
    #[serde(default, alias = "UID")]
    pub uuid: Option<String>,
    #[serde(default, alias = "FileName")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemotePhoto {
    pub fn new(uuid: &str, filename: &str) -> Self {
        Self {
            uuid: Some(uuid.to_string()),
            filename: Some(filename.to_string()),
            extra: Map::new(),
        }
    }
}
