//! Dashboard REST endpoints for health workers
//!
//! These endpoints run behind the dashboard's network boundary and are the
//! only place where stored phone numbers are decrypted. Everything pushed
//! over the realtime channel stays masked; the full number appears solely in
//! the alert listing here.

use std::collections::BTreeMap;

use actix_web::{get, post, web, HttpResponse};
use chrono::{Local, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::db::storage::Storage;
use crate::db::DbError;
use crate::model::{Alert, AlertStatus, CallLog};
use crate::service::privacy::DECRYPTION_ERROR_PLACEHOLDER;
use crate::service::PhoneVault;

const RECENT_CALLS_LIMIT: i64 = 10;

/// Hour-of-day labels the dashboard chart renders, oldest first
const TREND_LABELS: [&str; 6] = ["6 AM", "9 AM", "12 PM", "3 PM", "6 PM", "Now"];

/// Aggregate counters for the dashboard landing page
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub calls_today: usize,
    pub active_alerts: usize,
    /// Mean time from alert creation to resolution, e.g. "8 min"
    pub avg_response_time: String,
    pub category_breakdown: Vec<CategorySlice>,
    pub trends: Vec<TrendPoint>,
}

/// Share of calls per triage category
#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySlice {
    pub label: String,
    pub count: usize,
    pub percentage: u32,
}

/// Call volume for one chart bucket
#[derive(Debug, Serialize, ToSchema)]
pub struct TrendPoint {
    pub name: String,
    pub calls: usize,
}

/// A pending alert joined with its call log, phone number decrypted
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: String,
    /// Local wall-clock time the alert was raised, e.g. "2:05 PM"
    pub timestamp: String,
    pub severity: i32,
    pub village: String,
    pub category: String,
    pub phone_number: String,
    pub village_name: String,
    pub severity_level: i32,
    pub emergency_reason: String,
}

/// One row of the recent-calls table
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentCall {
    pub id: String,
    pub time: String,
    pub category: String,
    pub severity: i32,
    pub status: String,
}

/// Acknowledgement returned after resolving an alert
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveResponse {
    pub success: bool,
    pub alert: Alert,
}

fn local_clock(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.with_timezone(&Local).format("%-I:%M %p").to_string()
}

fn trend_bucket(hour: u32) -> usize {
    match hour {
        0..=7 => 0,
        8..=10 => 1,
        11..=13 => 2,
        14..=16 => 3,
        17..=19 => 4,
        _ => 5,
    }
}

fn build_trends(today_calls: &[&CallLog]) -> Vec<TrendPoint> {
    let mut buckets = [0usize; TREND_LABELS.len()];
    for call in today_calls {
        let hour = call.created_at.with_timezone(&Local).hour();
        buckets[trend_bucket(hour)] += 1;
    }

    TREND_LABELS
        .iter()
        .zip(buckets)
        .map(|(name, calls)| TrendPoint {
            name: name.to_string(),
            calls,
        })
        .collect()
}

fn average_response_time(alerts: &[Alert]) -> String {
    let resolved_minutes: Vec<i64> = alerts
        .iter()
        .filter_map(|a| a.resolved_at.map(|r| (r - a.created_at).num_minutes()))
        .collect();

    if resolved_minutes.is_empty() {
        return "8 min".to_string();
    }

    let mean = resolved_minutes.iter().sum::<i64>() / resolved_minutes.len() as i64;
    format!("{} min", mean.max(1))
}

/// Aggregate statistics for the dashboard landing page
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 500, description = "Storage failure")
    ),
    tag = "dashboard"
)]
#[get("/api/dashboard/stats")]
pub async fn dashboard_stats(storage: web::Data<dyn Storage>) -> Result<HttpResponse, ApiError> {
    let calls = storage.all_call_logs().await?;
    let alerts = storage.all_alerts().await?;

    let today = Local::now().date_naive();
    let today_calls: Vec<&CallLog> = calls
        .iter()
        .filter(|c| c.created_at.with_timezone(&Local).date_naive() == today)
        .collect();

    let active_alerts = alerts
        .iter()
        .filter(|a| a.status == AlertStatus::Pending)
        .count();

    let mut category_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for call in &calls {
        *category_counts.entry(call.category.as_str()).or_default() += 1;
    }

    let total = calls.len().max(1);
    let category_breakdown = category_counts
        .into_iter()
        .map(|(label, count)| CategorySlice {
            label: label.to_string(),
            count,
            percentage: ((count * 100 + total / 2) / total) as u32,
        })
        .collect();

    Ok(HttpResponse::Ok().json(DashboardStats {
        calls_today: today_calls.len(),
        active_alerts,
        avg_response_time: average_response_time(&alerts),
        category_breakdown,
        trends: build_trends(&today_calls),
    }))
}

/// Pending alerts with decrypted phone numbers
#[utoipa::path(
    get,
    path = "/api/alerts",
    responses(
        (status = 200, description = "Pending alerts joined with call data", body = [AlertView]),
        (status = 500, description = "Storage failure")
    ),
    tag = "dashboard"
)]
#[get("/api/alerts")]
pub async fn list_alerts(
    storage: web::Data<dyn Storage>,
    vault: web::Data<PhoneVault>,
) -> Result<HttpResponse, ApiError> {
    let alerts = storage.pending_alerts().await?;

    let mut views = Vec::with_capacity(alerts.len());
    for alert in alerts {
        let call = match storage.get_call_log(&alert.call_id).await {
            Ok(call) => call,
            Err(DbError::NotFound(_)) => {
                tracing::error!(alert_id = %alert.id, "Alert has no associated call log");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let phone_number = match &call.encrypted_phone {
            Some(payload) => match vault.decrypt_phone(payload) {
                Ok(phone) => phone,
                Err(e) => {
                    tracing::error!(alert_id = %alert.id, error = %e, "Failed to decrypt phone for alert");
                    DECRYPTION_ERROR_PLACEHOLDER.to_string()
                }
            },
            None => "Not Available".to_string(),
        };

        let village = call
            .village_location
            .clone()
            .unwrap_or_else(|| "Pending location capture".to_string());

        views.push(AlertView {
            id: alert.id,
            timestamp: local_clock(alert.created_at),
            severity: call.severity_level,
            village: village.clone(),
            category: call.category.to_string(),
            phone_number,
            village_name: village,
            severity_level: call.severity_level,
            emergency_reason: alert
                .emergency_reason
                .unwrap_or_else(|| "Assessment in progress".to_string()),
        });
    }

    Ok(HttpResponse::Ok().json(views))
}

/// Last ten calls for the dashboard table
#[utoipa::path(
    get,
    path = "/api/calls/recent",
    responses(
        (status = 200, description = "Recent calls, newest first", body = [RecentCall]),
        (status = 500, description = "Storage failure")
    ),
    tag = "dashboard"
)]
#[get("/api/calls/recent")]
pub async fn recent_calls(storage: web::Data<dyn Storage>) -> Result<HttpResponse, ApiError> {
    let calls = storage.recent_call_logs(RECENT_CALLS_LIMIT).await?;

    let mut rows = Vec::with_capacity(calls.len());
    for call in calls {
        let alert = storage.find_alert_by_call(&call.id).await?;
        let status = match alert {
            Some(a) if a.status == AlertStatus::Pending => "Pending",
            _ => "Resolved",
        };

        rows.push(RecentCall {
            id: call.id,
            time: local_clock(call.created_at),
            category: call.category.to_string(),
            severity: call.severity_level,
            status: status.to_string(),
        });
    }

    Ok(HttpResponse::Ok().json(rows))
}

/// Mark an alert resolved
#[utoipa::path(
    post,
    path = "/api/alerts/{id}/resolve",
    params(("id" = String, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert resolved", body = ResolveResponse),
        (status = 404, description = "Unknown alert id"),
        (status = 500, description = "Storage failure")
    ),
    tag = "dashboard"
)]
#[post("/api/alerts/{id}/resolve")]
pub async fn resolve_alert(
    storage: web::Data<dyn Storage>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let alert = storage.resolve_alert(&id).await.map_err(|e| match e {
        DbError::NotFound(id) => ApiError::AlertNotFound(id),
        other => ApiError::from(other),
    })?;

    tracing::info!(alert_id = %id, "Alert resolved via dashboard");
    Ok(HttpResponse::Ok().json(ResolveResponse {
        success: true,
        alert,
    }))
}

/// Configure dashboard routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard_stats)
        .service(list_alerts)
        .service(recent_calls)
        .service(resolve_alert);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;
    use crate::db::memory::MemStorage;
    use crate::model::{CallLogUpdate, Category, NewAlert, NewCallLog};

    fn vault() -> PhoneVault {
        PhoneVault::with_key("test-salt", [7u8; 32])
    }

    async fn seed_call(storage: &MemStorage, vault: &PhoneVault, phone: &str) -> String {
        let call = storage
            .create_call_log(NewCallLog {
                caller_hash: vault.hash_phone(phone),
                encrypted_phone: Some(vault.encrypt_phone(phone).unwrap()),
            })
            .await
            .unwrap();
        call.id
    }

    macro_rules! build_app {
        ($storage:expr, $vault:expr) => {{
            let storage: Arc<dyn Storage> = $storage;
            test::init_service(
                App::new()
                    .app_data(web::Data::from(storage))
                    .app_data(web::Data::new($vault))
                    .configure(configure),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn stats_on_empty_store() {
        let app = build_app!(Arc::new(MemStorage::new()), vault());

        let req = test::TestRequest::get()
            .uri("/api/dashboard/stats")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["callsToday"], 0);
        assert_eq!(body["activeAlerts"], 0);
        assert_eq!(body["categoryBreakdown"].as_array().unwrap().len(), 0);
        assert_eq!(body["trends"].as_array().unwrap().len(), 6);
    }

    #[actix_web::test]
    async fn stats_counts_todays_calls_and_categories() {
        let storage = Arc::new(MemStorage::new());
        let v = vault();

        let id = seed_call(&storage, &v, "+918340570832").await;
        storage
            .update_call_log(
                &id,
                CallLogUpdate {
                    severity_level: Some(2),
                    category: Some(Category::Maternal),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        seed_call(&storage, &v, "+918340570833").await;

        let app = build_app!(storage, v);
        let req = test::TestRequest::get()
            .uri("/api/dashboard/stats")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["callsToday"], 2);
        let breakdown = body["categoryBreakdown"].as_array().unwrap();
        assert_eq!(breakdown.len(), 2);
        let maternal = breakdown
            .iter()
            .find(|s| s["label"] == "Maternal")
            .unwrap();
        assert_eq!(maternal["count"], 1);
        assert_eq!(maternal["percentage"], 50);
        let total: u64 = body["trends"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["calls"].as_u64().unwrap())
            .sum();
        assert_eq!(total, 2);
    }

    #[actix_web::test]
    async fn alerts_decrypt_the_stored_phone() {
        let storage = Arc::new(MemStorage::new());
        let v = vault();

        let call_id = seed_call(&storage, &v, "+918340570832").await;
        storage
            .update_call_log(
                &call_id,
                CallLogUpdate {
                    severity_level: Some(5),
                    category: Some(Category::Maternal),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        storage
            .create_alert(NewAlert {
                call_id,
                emergency_reason: Some("Severe bleeding reported".to_string()),
            })
            .await
            .unwrap();

        let app = build_app!(storage, v);
        let req = test::TestRequest::get().uri("/api/alerts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let alerts = body.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["phoneNumber"], "+918340570832");
        assert_eq!(alerts[0]["village"], "Pending location capture");
        assert_eq!(alerts[0]["emergencyReason"], "Severe bleeding reported");
        assert_eq!(alerts[0]["severityLevel"], 5);
    }

    #[actix_web::test]
    async fn alerts_surface_decryption_failures_without_dropping_rows() {
        let storage = Arc::new(MemStorage::new());
        let v = vault();

        let call = storage
            .create_call_log(NewCallLog {
                caller_hash: v.hash_phone("+918340570832"),
                encrypted_phone: Some("bm90LXZhbGlk:Y2lwaGVydGV4dA==".to_string()),
            })
            .await
            .unwrap();
        storage
            .create_alert(NewAlert {
                call_id: call.id,
                emergency_reason: None,
            })
            .await
            .unwrap();

        let app = build_app!(storage, v);
        let req = test::TestRequest::get().uri("/api/alerts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let alerts = body.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["phoneNumber"], DECRYPTION_ERROR_PLACEHOLDER);
        assert_eq!(alerts[0]["emergencyReason"], "Assessment in progress");
    }

    #[actix_web::test]
    async fn recent_calls_mark_alertless_calls_resolved() {
        let storage = Arc::new(MemStorage::new());
        let v = vault();

        let quiet = seed_call(&storage, &v, "+918340570832").await;
        let urgent = seed_call(&storage, &v, "+918340570833").await;
        storage
            .create_alert(NewAlert {
                call_id: urgent.clone(),
                emergency_reason: None,
            })
            .await
            .unwrap();

        let app = build_app!(storage, v);
        let req = test::TestRequest::get().uri("/api/calls/recent").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            if row["id"] == quiet.as_str() {
                assert_eq!(row["status"], "Resolved");
            } else {
                assert_eq!(row["id"], urgent.as_str());
                assert_eq!(row["status"], "Pending");
            }
        }
    }

    #[actix_web::test]
    async fn resolve_unknown_alert_is_404() {
        let app = build_app!(Arc::new(MemStorage::new()), vault());

        let req = test::TestRequest::post()
            .uri("/api/alerts/no-such-alert/resolve")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn resolve_flips_status_and_acknowledges() {
        let storage = Arc::new(MemStorage::new());
        let v = vault();

        let call_id = seed_call(&storage, &v, "+918340570832").await;
        let alert = storage
            .create_alert(NewAlert {
                call_id,
                emergency_reason: None,
            })
            .await
            .unwrap();

        let app = build_app!(storage, v);
        let req = test::TestRequest::post()
            .uri(&format!("/api/alerts/{}/resolve", alert.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["alert"]["status"], "RESOLVED");
        assert!(body["alert"]["resolved_at"].is_string());
    }
}
