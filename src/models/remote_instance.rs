use chrono::{DateTime, Utc};
use remote_client::InstanceConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant's remote photo-management deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteInstance {
    pub id: String,
    pub tenant_id: String,
    pub instance_name: String,
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub status: InstanceStatus,
    pub last_health_check: Option<DateTime<Utc>>,
    pub last_health_ok: Option<bool>,
}

impl RemoteInstance {
    pub fn new(tenant_id: &str, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            instance_name: format!("{}-photos", tenant_id),
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            status: InstanceStatus::Active,
            last_health_check: None,
            last_health_ok: None,
        }
    }

    /// Settings handed to the client registry
    pub fn client_config(&self) -> InstanceConfig {
        InstanceConfig {
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Active,
    Inactive,
    Provisioning,
    Error,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Active => "active",
            InstanceStatus::Inactive => "inactive",
            InstanceStatus::Provisioning => "provisioning",
            InstanceStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(InstanceStatus::Active),
            "inactive" => Some(InstanceStatus::Inactive),
            "provisioning" => Some(InstanceStatus::Provisioning),
            "error" => Some(InstanceStatus::Error),
            _ => None,
        }
    }
}
