//! Database row types for call logs and alerts

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::model::{Alert, AlertStatus, CallLog, Category};

/// Database representation of a call log
#[derive(Debug, Clone, FromRow)]
pub struct CallLogRow {
    pub id: String,
    pub caller_hash: String,
    pub encrypted_phone: Option<String>,
    pub transcription: Option<String>,
    pub ai_response: Option<String>,
    pub severity_level: i32,
    pub category: String,
    pub is_break_glass: bool,
    pub village_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CallLogRow {
    /// Convert database row to domain model
    pub fn into_domain(self) -> CallLog {
        CallLog {
            id: self.id,
            caller_hash: self.caller_hash,
            encrypted_phone: self.encrypted_phone,
            transcription: self.transcription,
            ai_response: self.ai_response,
            severity_level: self.severity_level,
            category: Category::parse(&self.category),
            is_break_glass: self.is_break_glass,
            village_location: self.village_location,
            created_at: self.created_at,
        }
    }
}

/// Database representation of an alert
#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: String,
    pub call_id: String,
    pub asha_worker_id: Option<String>,
    pub status: String,
    pub emergency_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AlertRow {
    /// Convert database row to domain model
    pub fn into_domain(self) -> Alert {
        Alert {
            id: self.id,
            call_id: self.call_id,
            asha_worker_id: self.asha_worker_id,
            status: alert_status_from_string(&self.status),
            emergency_reason: self.emergency_reason,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        }
    }
}

/// Helper to convert AlertStatus from its database string
pub fn alert_status_from_string(status: &str) -> AlertStatus {
    match status {
        "RESOLVED" => AlertStatus::Resolved,
        _ => AlertStatus::Pending,
    }
}
