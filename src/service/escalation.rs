//! Emergency escalation funnel
//!
//! Applies triage results to the call record, raises at most one alert per
//! call, and runs the break-glass de-anonymization when the village name
//! arrives.

use std::sync::Arc;

use crate::db::storage::Storage;
use crate::db::DbError;
use crate::model::{
    Alert, CallLog, CallLogUpdate, EmergencyAlertEvent, NewAlert, TriageAnalysis,
};
use crate::service::privacy::{PhoneVault, MASKED_PLACEHOLDER};
use crate::service::realtime::AlertBroadcaster;

#[derive(Debug, thiserror::Error)]
pub enum EscalationError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

/// Orchestrates the record updates and alerting that follow each analysed
/// turn
pub struct EscalationService {
    storage: Arc<dyn Storage>,
    vault: PhoneVault,
    broadcaster: AlertBroadcaster,
}

impl EscalationService {
    pub fn new(storage: Arc<dyn Storage>, vault: PhoneVault, broadcaster: AlertBroadcaster) -> Self {
        Self {
            storage,
            vault,
            broadcaster,
        }
    }

    /// Write one turn's analysis onto the call log and raise an alert if
    /// the severity crossed the emergency threshold. Returns the updated
    /// call.
    pub async fn apply_analysis(
        &self,
        call_id: &str,
        analysis: &TriageAnalysis,
        recording_url: &str,
    ) -> Result<CallLog, EscalationError> {
        let transcription = analysis
            .transcription
            .clone()
            .unwrap_or_else(|| format!("Recording URL: {}", recording_url));

        let call = self
            .storage
            .update_call_log(
                call_id,
                CallLogUpdate {
                    transcription: Some(transcription),
                    ai_response: Some(analysis.response_text.clone()),
                    severity_level: Some(analysis.severity),
                    category: Some(analysis.category),
                    ..Default::default()
                },
            )
            .await?;

        if analysis.is_emergency() {
            tracing::warn!(
                call_id = %call.id,
                severity = analysis.severity,
                "Emergency detected, activating break-glass protocol"
            );
            self.ensure_alert(&call, analysis.emergency_reason.clone())
                .await?;
        }

        Ok(call)
    }

    /// Find the alert for a call or create a pending one. At most one
    /// alert ever exists per call; repeated escalations on the same call
    /// reuse it.
    pub async fn ensure_alert(
        &self,
        call: &CallLog,
        reason: Option<String>,
    ) -> Result<Alert, EscalationError> {
        if let Some(existing) = self.storage.find_alert_by_call(&call.id).await? {
            tracing::debug!(alert_id = %existing.id, call_id = %call.id, "Alert already exists for call");
            return Ok(existing);
        }

        let reason = reason
            .unwrap_or_else(|| format!("Severity {} emergency detected", call.severity_level));

        let alert = self
            .storage
            .create_alert(NewAlert {
                call_id: call.id.clone(),
                emergency_reason: Some(reason),
            })
            .await?;

        tracing::warn!(alert_id = %alert.id, call_id = %call.id, "Emergency alert created");
        Ok(alert)
    }

    /// Break-glass confirmation: stamp the village onto the call, make
    /// sure the alert exists, and push the masked event to dashboards.
    pub async fn break_glass(
        &self,
        call_id: &str,
        village_name: String,
    ) -> Result<Alert, EscalationError> {
        let call = self
            .storage
            .update_call_log(
                call_id,
                CallLogUpdate {
                    is_break_glass: Some(true),
                    village_location: Some(village_name.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let fallback_reason = format!(
            "Severity {} emergency from {}",
            call.severity_level, village_name
        );
        let alert = self.ensure_alert(&call, Some(fallback_reason)).await?;

        let masked_phone = self.masked_phone(&call);

        let event = EmergencyAlertEvent {
            id: alert.id.clone(),
            phone_number: masked_phone,
            village_name,
            timestamp: chrono::Local::now().format("%-I:%M %p").to_string(),
            severity_level: call.severity_level,
            category: call.category.to_string(),
            emergency_reason: alert
                .emergency_reason
                .clone()
                .unwrap_or_else(|| "Assessment in progress".to_string()),
        };

        self.broadcaster.broadcast(event);

        tracing::info!(
            alert_id = %alert.id,
            call_id = %call.id,
            severity = call.severity_level,
            "Break-glass complete, alert broadcast"
        );

        Ok(alert)
    }

    /// Masked number for the push channel. Decryption failures degrade to
    /// the placeholder; the alert still goes out.
    fn masked_phone(&self, call: &CallLog) -> String {
        let Some(encrypted) = &call.encrypted_phone else {
            return MASKED_PLACEHOLDER.to_string();
        };

        match self.vault.decrypt_phone(encrypted) {
            Ok(phone) => PhoneVault::mask_phone(&phone),
            Err(e) => {
                tracing::error!(call_id = %call.id, error = %e, "Phone decryption failed, masking with placeholder");
                MASKED_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemStorage;
    use crate::model::{Category, NewCallLog};

    fn service_with_store() -> (EscalationService, Arc<MemStorage>) {
        let store = Arc::new(MemStorage::new());
        let vault = PhoneVault::with_key("test-salt", [7u8; 32]);
        let service = EscalationService::new(
            store.clone() as Arc<dyn Storage>,
            vault,
            AlertBroadcaster::new(),
        );
        (service, store)
    }

    fn emergency_analysis() -> TriageAnalysis {
        TriageAnalysis {
            severity: 5,
            category: Category::Maternal,
            response_text: "मैं ASHA कार्यकर्ता को अलर्ट कर रही हूं।".to_string(),
            emergency_reason: Some("Heavy bleeding reported".to_string()),
            transcription: Some("बहुत खून बह रहा है".to_string()),
        }
    }

    fn routine_analysis() -> TriageAnalysis {
        TriageAnalysis {
            severity: 2,
            category: Category::General,
            response_text: "आराम करें और पानी पिएं।".to_string(),
            emergency_reason: None,
            transcription: Some("मुझे थकान हो रही है".to_string()),
        }
    }

    async fn seed_call(store: &MemStorage) -> CallLog {
        store
            .create_call_log(NewCallLog {
                caller_hash: "hash".to_string(),
                encrypted_phone: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn emergency_analysis_creates_one_alert() {
        let (service, store) = service_with_store();
        let call = seed_call(&store).await;

        service
            .apply_analysis(&call.id, &emergency_analysis(), "https://rec/1")
            .await
            .unwrap();

        let alerts = store.all_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].emergency_reason.as_deref(),
            Some("Heavy bleeding reported")
        );
    }

    #[tokio::test]
    async fn repeated_escalation_is_idempotent() {
        let (service, store) = service_with_store();
        let call = seed_call(&store).await;

        service
            .apply_analysis(&call.id, &emergency_analysis(), "https://rec/1")
            .await
            .unwrap();
        service
            .apply_analysis(&call.id, &emergency_analysis(), "https://rec/2")
            .await
            .unwrap();
        service
            .break_glass(&call.id, "Rampur".to_string())
            .await
            .unwrap();

        assert_eq!(store.all_alerts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn routine_analysis_creates_no_alert() {
        let (service, store) = service_with_store();
        let call = seed_call(&store).await;

        let updated = service
            .apply_analysis(&call.id, &routine_analysis(), "https://rec/1")
            .await
            .unwrap();

        assert_eq!(updated.severity_level, 2);
        assert!(store.all_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn break_glass_without_prior_alert_creates_one() {
        let (service, store) = service_with_store();
        let call = seed_call(&store).await;

        let alert = service
            .break_glass(&call.id, "Rampur".to_string())
            .await
            .unwrap();

        let stored = store.get_call_log(&call.id).await.unwrap();
        assert!(stored.is_break_glass);
        assert_eq!(stored.village_location.as_deref(), Some("Rampur"));
        assert!(alert
            .emergency_reason
            .as_deref()
            .unwrap()
            .contains("Rampur"));
    }

    #[tokio::test]
    async fn break_glass_broadcasts_masked_number() {
        let store = Arc::new(MemStorage::new());
        let vault = PhoneVault::with_key("test-salt", [7u8; 32]);
        let encrypted = vault.encrypt_phone("+918340570832").unwrap();
        let broadcaster = AlertBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let service = EscalationService::new(
            store.clone() as Arc<dyn Storage>,
            vault,
            broadcaster,
        );

        let call = store
            .create_call_log(NewCallLog {
                caller_hash: "hash".to_string(),
                encrypted_phone: Some(encrypted),
            })
            .await
            .unwrap();

        service
            .apply_analysis(&call.id, &emergency_analysis(), "https://rec/1")
            .await
            .unwrap();
        service
            .break_glass(&call.id, "Rampur".to_string())
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.phone_number, "****-****-0832");
        assert!(!event.phone_number.contains("+91834057"));
        assert_eq!(event.village_name, "Rampur");
        assert_eq!(event.severity_level, 5);
    }

    #[tokio::test]
    async fn break_glass_survives_missing_phone() {
        let (service, store) = service_with_store();
        let call = seed_call(&store).await;

        let alert = service
            .break_glass(&call.id, "Rampur".to_string())
            .await
            .unwrap();

        assert_eq!(store.get_alert(&alert.id).await.unwrap().id, alert.id);
    }
}
