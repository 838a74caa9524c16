//! Storage abstraction over call logs and alerts

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{AlertRow, CallLogRow};
use super::DbError;
use crate::model::{Alert, AlertStatus, CallLog, CallLogUpdate, NewAlert, NewCallLog};

/// Persistence seam for the IVR funnel and the dashboard API. Object-safe
/// so handlers can run against PostgreSQL or the in-memory double.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_call_log(&self, new: NewCallLog) -> Result<CallLog, DbError>;

    async fn get_call_log(&self, id: &str) -> Result<CallLog, DbError>;

    async fn update_call_log(&self, id: &str, update: CallLogUpdate) -> Result<CallLog, DbError>;

    /// Most recent call for a caller hash. Fallback correlation only; the
    /// session registry is the primary key for in-flight calls.
    async fn latest_call_by_hash(&self, caller_hash: &str) -> Result<Option<CallLog>, DbError>;

    /// Newest calls first, capped at `limit`
    async fn recent_call_logs(&self, limit: i64) -> Result<Vec<CallLog>, DbError>;

    async fn all_call_logs(&self) -> Result<Vec<CallLog>, DbError>;

    async fn create_alert(&self, new: NewAlert) -> Result<Alert, DbError>;

    async fn get_alert(&self, id: &str) -> Result<Alert, DbError>;

    /// The alert raised for a call, if any. At most one exists per call.
    async fn find_alert_by_call(&self, call_id: &str) -> Result<Option<Alert>, DbError>;

    async fn pending_alerts(&self) -> Result<Vec<Alert>, DbError>;

    async fn all_alerts(&self) -> Result<Vec<Alert>, DbError>;

    /// Mark an alert resolved, stamping `resolved_at`. `NotFound` when the
    /// id is unknown; the store is left untouched in that case.
    async fn resolve_alert(&self, id: &str) -> Result<Alert, DbError>;
}

/// PostgreSQL-backed storage
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn create_call_log(&self, new: NewCallLog) -> Result<CallLog, DbError> {
        let id = Uuid::new_v4().to_string();

        let row: CallLogRow = sqlx::query_as(
            r#"
            INSERT INTO call_logs (id, caller_hash, encrypted_phone)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&new.caller_hash)
        .bind(&new.encrypted_phone)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(call_id = %id, "Created call log");
        Ok(row.into_domain())
    }

    async fn get_call_log(&self, id: &str) -> Result<CallLog, DbError> {
        let row: CallLogRow = sqlx::query_as("SELECT * FROM call_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        Ok(row.into_domain())
    }

    async fn update_call_log(&self, id: &str, update: CallLogUpdate) -> Result<CallLog, DbError> {
        let row: CallLogRow = sqlx::query_as(
            r#"
            UPDATE call_logs SET
                transcription = COALESCE($2, transcription),
                ai_response = COALESCE($3, ai_response),
                severity_level = COALESCE($4, severity_level),
                category = COALESCE($5, category),
                is_break_glass = COALESCE($6, is_break_glass),
                village_location = COALESCE($7, village_location)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.transcription)
        .bind(&update.ai_response)
        .bind(update.severity_level)
        .bind(update.category.map(|c| c.as_str()))
        .bind(update.is_break_glass)
        .bind(&update.village_location)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        Ok(row.into_domain())
    }

    async fn latest_call_by_hash(&self, caller_hash: &str) -> Result<Option<CallLog>, DbError> {
        let row: Option<CallLogRow> = sqlx::query_as(
            r#"
            SELECT * FROM call_logs
            WHERE caller_hash = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(caller_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CallLogRow::into_domain))
    }

    async fn recent_call_logs(&self, limit: i64) -> Result<Vec<CallLog>, DbError> {
        let rows: Vec<CallLogRow> =
            sqlx::query_as("SELECT * FROM call_logs ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(CallLogRow::into_domain).collect())
    }

    async fn all_call_logs(&self) -> Result<Vec<CallLog>, DbError> {
        let rows: Vec<CallLogRow> =
            sqlx::query_as("SELECT * FROM call_logs ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(CallLogRow::into_domain).collect())
    }

    async fn create_alert(&self, new: NewAlert) -> Result<Alert, DbError> {
        let id = Uuid::new_v4().to_string();

        let row: AlertRow = sqlx::query_as(
            r#"
            INSERT INTO alerts (id, call_id, status, emergency_reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&new.call_id)
        .bind(AlertStatus::Pending.as_str())
        .bind(&new.emergency_reason)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(alert_id = %id, call_id = %new.call_id, "Created alert");
        Ok(row.into_domain())
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, DbError> {
        let row: AlertRow = sqlx::query_as("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        Ok(row.into_domain())
    }

    async fn find_alert_by_call(&self, call_id: &str) -> Result<Option<Alert>, DbError> {
        let row: Option<AlertRow> = sqlx::query_as(
            "SELECT * FROM alerts WHERE call_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AlertRow::into_domain))
    }

    async fn pending_alerts(&self) -> Result<Vec<Alert>, DbError> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            "SELECT * FROM alerts WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(AlertStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertRow::into_domain).collect())
    }

    async fn all_alerts(&self) -> Result<Vec<Alert>, DbError> {
        let rows: Vec<AlertRow> = sqlx::query_as("SELECT * FROM alerts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AlertRow::into_domain).collect())
    }

    async fn resolve_alert(&self, id: &str) -> Result<Alert, DbError> {
        let row: AlertRow = sqlx::query_as(
            r#"
            UPDATE alerts SET status = $2, resolved_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(AlertStatus::Resolved.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        tracing::info!(alert_id = %id, "Alert resolved");
        Ok(row.into_domain())
    }
}
