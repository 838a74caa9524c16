//! In-memory storage double for tests and database-less development

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::storage::Storage;
use super::DbError;
use crate::model::{Alert, AlertStatus, CallLog, CallLogUpdate, Category, NewAlert, NewCallLog};

/// HashMap-backed storage with the same semantics as `PgStorage`
#[derive(Default)]
pub struct MemStorage {
    call_logs: RwLock<HashMap<String, CallLog>>,
    alerts: RwLock<HashMap<String, Alert>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn create_call_log(&self, new: NewCallLog) -> Result<CallLog, DbError> {
        let call = CallLog {
            id: Uuid::new_v4().to_string(),
            caller_hash: new.caller_hash,
            encrypted_phone: new.encrypted_phone,
            transcription: None,
            ai_response: None,
            severity_level: 0,
            category: Category::General,
            is_break_glass: false,
            village_location: None,
            created_at: Utc::now(),
        };

        self.call_logs
            .write()
            .await
            .insert(call.id.clone(), call.clone());
        Ok(call)
    }

    async fn get_call_log(&self, id: &str) -> Result<CallLog, DbError> {
        self.call_logs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn update_call_log(&self, id: &str, update: CallLogUpdate) -> Result<CallLog, DbError> {
        let mut calls = self.call_logs.write().await;
        let call = calls
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        if let Some(t) = update.transcription {
            call.transcription = Some(t);
        }
        if let Some(r) = update.ai_response {
            call.ai_response = Some(r);
        }
        if let Some(s) = update.severity_level {
            call.severity_level = s;
        }
        if let Some(c) = update.category {
            call.category = c;
        }
        if let Some(b) = update.is_break_glass {
            call.is_break_glass = b;
        }
        if let Some(v) = update.village_location {
            call.village_location = Some(v);
        }

        Ok(call.clone())
    }

    async fn latest_call_by_hash(&self, caller_hash: &str) -> Result<Option<CallLog>, DbError> {
        let calls = self.call_logs.read().await;
        Ok(calls
            .values()
            .filter(|c| c.caller_hash == caller_hash)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn recent_call_logs(&self, limit: i64) -> Result<Vec<CallLog>, DbError> {
        let calls = self.call_logs.read().await;
        let mut all: Vec<CallLog> = calls.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit.max(0) as usize);
        Ok(all)
    }

    async fn all_call_logs(&self) -> Result<Vec<CallLog>, DbError> {
        let calls = self.call_logs.read().await;
        let mut all: Vec<CallLog> = calls.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn create_alert(&self, new: NewAlert) -> Result<Alert, DbError> {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            call_id: new.call_id,
            asha_worker_id: None,
            status: AlertStatus::Pending,
            emergency_reason: new.emergency_reason,
            created_at: Utc::now(),
            resolved_at: None,
        };

        self.alerts
            .write()
            .await
            .insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, DbError> {
        self.alerts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn find_alert_by_call(&self, call_id: &str) -> Result<Option<Alert>, DbError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .values()
            .filter(|a| a.call_id == call_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn pending_alerts(&self) -> Result<Vec<Alert>, DbError> {
        let alerts = self.alerts.read().await;
        let mut pending: Vec<Alert> = alerts
            .values()
            .filter(|a| a.status == AlertStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn all_alerts(&self) -> Result<Vec<Alert>, DbError> {
        let alerts = self.alerts.read().await;
        let mut all: Vec<Alert> = alerts.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn resolve_alert(&self, id: &str) -> Result<Alert, DbError> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_call(hash: &str) -> NewCallLog {
        NewCallLog {
            caller_hash: hash.to_string(),
            encrypted_phone: Some("nonce:cipher".to_string()),
        }
    }

    #[tokio::test]
    async fn created_call_starts_pending_analysis() {
        let store = MemStorage::new();
        let call = store.create_call_log(new_call("abc")).await.unwrap();

        assert_eq!(call.severity_level, 0);
        assert!(call.is_pending_analysis());
        assert_eq!(call.category, Category::General);
        assert!(!call.is_break_glass);
    }

    #[tokio::test]
    async fn update_is_partial() {
        let store = MemStorage::new();
        let call = store.create_call_log(new_call("abc")).await.unwrap();

        store
            .update_call_log(
                &call.id,
                CallLogUpdate {
                    transcription: Some("pet me dard hai".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_call_log(
                &call.id,
                CallLogUpdate {
                    severity_level: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.transcription.as_deref(), Some("pet me dard hai"));
        assert_eq!(updated.severity_level, 3);
    }

    #[tokio::test]
    async fn latest_call_by_hash_picks_newest() {
        let store = MemStorage::new();
        let first = store.create_call_log(new_call("same")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create_call_log(new_call("same")).await.unwrap();

        let latest = store.latest_call_by_hash("same").await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_ne!(latest.id, first.id);

        assert!(store.latest_call_by_hash("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_unknown_alert_is_not_found() {
        let store = MemStorage::new();
        let result = store.resolve_alert("missing").await;

        assert!(matches!(result, Err(DbError::NotFound(_))));
        assert!(store.all_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_stamps_resolved_at() {
        let store = MemStorage::new();
        let call = store.create_call_log(new_call("abc")).await.unwrap();
        let alert = store
            .create_alert(NewAlert {
                call_id: call.id.clone(),
                emergency_reason: Some("Severe bleeding reported".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(alert.status, AlertStatus::Pending);
        assert!(alert.resolved_at.is_none());

        let resolved = store.resolve_alert(&alert.id).await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        assert!(store.pending_alerts().await.unwrap().is_empty());
    }
}
