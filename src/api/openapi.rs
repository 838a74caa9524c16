//! OpenAPI specification endpoints

use actix_web::{get, HttpResponse, Responder};
use utoipa::OpenApi;

use crate::api::{dashboard, health, ivr};
use crate::model::{Alert, AlertStatus, CallLog, Category};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Maitri IVR",
        description = "Telephone-based health triage intake with AI analysis and real-time escalation"
    ),
    paths(
        ivr::incoming,
        ivr::process_audio,
        ivr::continue_conversation,
        ivr::break_glass_confirm,
        dashboard::dashboard_stats,
        dashboard::list_alerts,
        dashboard::recent_calls,
        dashboard::resolve_alert,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        Alert,
        AlertStatus,
        CallLog,
        Category,
        dashboard::DashboardStats,
        dashboard::CategorySlice,
        dashboard::TrendPoint,
        dashboard::AlertView,
        dashboard::RecentCall,
        dashboard::ResolveResponse,
        health::HealthStatus,
        health::ReadinessStatus,
        health::DependencyHealth,
    )),
    tags(
        (name = "ivr", description = "Telephony webhook endpoints"),
        (name = "dashboard", description = "Health worker dashboard API"),
        (name = "health", description = "Probe endpoints")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render OpenAPI YAML");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
