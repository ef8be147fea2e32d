use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local photo record tracked against the remote deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Photo {
    pub id: String,
    pub tenant_id: String,
    pub filename: String,
    pub original_path: String,
    pub sync_status: SyncStatus,
    /// Starts at 1, bumped once per successful sync
    pub sync_version: i64,
    pub remote_uuid: Option<String>,
    pub remote_filename: Option<String>,
    /// Most recent last
    pub sync_errors: Vec<String>,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    pub fn new(tenant_id: &str, filename: &str, original_path: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            filename: filename.to_string(),
            original_path: original_path.to_string(),
            sync_status: SyncStatus::Pending,
            sync_version: 1,
            remote_uuid: None,
            remote_filename: None,
            sync_errors: Vec::new(),
            last_sync_attempt: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
    Orphaned,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 5] = [
        SyncStatus::Pending,
        SyncStatus::Syncing,
        SyncStatus::Synced,
        SyncStatus::Failed,
        SyncStatus::Orphaned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Orphaned => "orphaned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncStatus::Pending),
            "syncing" => Some(SyncStatus::Syncing),
            "synced" => Some(SyncStatus::Synced),
            "failed" => Some(SyncStatus::Failed),
            "orphaned" => Some(SyncStatus::Orphaned),
            _ => None,
        }
    }

    /// Edges of the per-photo sync state machine.
    ///
    /// `Synced -> Pending` is only taken by reconciliation when the remote
    /// copy has disappeared.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Failed)
                | (SyncStatus::Failed, SyncStatus::Pending)
                | (SyncStatus::Synced, SyncStatus::Pending)
        )
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
