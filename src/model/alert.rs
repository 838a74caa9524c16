//! Emergency alert domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "PENDING",
            AlertStatus::Resolved => "RESOLVED",
        }
    }
}

/// Escalation record derived from a CallLog once severity crosses the
/// emergency threshold. At most one alert exists per call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub id: String,
    pub call_id: String,
    /// Responder assignment is carried but never exercised by this system
    pub asha_worker_id: Option<String>,
    pub status: AlertStatus,
    pub emergency_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Fields required to create a pending alert
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub call_id: String,
    pub emergency_reason: Option<String>,
}
