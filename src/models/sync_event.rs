use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append-only audit record of one synchronisation attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncEvent {
    pub id: String,
    pub photo_id: String,
    pub instance_id: String,
    pub event_type: SyncEventType,
    pub event_status: SyncEventStatus,
    pub payload: Value,
    pub error_details: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncEvent {
    pub fn new(photo_id: &str, instance_id: &str, event_type: SyncEventType, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            photo_id: photo_id.to_string(),
            instance_id: instance_id.to_string(),
            event_type,
            event_status: SyncEventStatus::Pending,
            payload,
            error_details: None,
            processing_time_ms: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncEventType {
    Upload,
    Update,
    Delete,
    Reconcile,
}

impl SyncEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventType::Upload => "upload",
            SyncEventType::Update => "update",
            SyncEventType::Delete => "delete",
            SyncEventType::Reconcile => "reconcile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(SyncEventType::Upload),
            "update" => Some(SyncEventType::Update),
            "delete" => Some(SyncEventType::Delete),
            "reconcile" => Some(SyncEventType::Reconcile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncEventStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl SyncEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventStatus::Pending => "pending",
            SyncEventStatus::Processing => "processing",
            SyncEventStatus::Success => "success",
            SyncEventStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncEventStatus::Pending),
            "processing" => Some(SyncEventStatus::Processing),
            "success" => Some(SyncEventStatus::Success),
            "failed" => Some(SyncEventStatus::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SyncEventStatus::Pending | SyncEventStatus::Processing)
    }
}
