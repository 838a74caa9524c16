//! Real-time push payloads

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Event broadcast to connected dashboards the moment a call escalates.
/// Carries only the masked number; full decryption stays server-side in
/// the REST layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlertEvent {
    pub id: String,
    /// Masked caller number, last four digits only
    pub phone_number: String,
    pub village_name: String,
    /// Local wall-clock time, e.g. "2:31 PM"
    pub timestamp: String,
    pub severity_level: i32,
    pub category: String,
    pub emergency_reason: String,
}
