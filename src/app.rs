//! Application state and service initialization
//!
//! This module centralizes all service initialization and dependency
//! injection, making it easier to manage the application lifecycle and test
//! services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::storage::{PgStorage, Storage};
use crate::model::Config;
use crate::service::{
    AlertBroadcaster, EscalationService, LlmClient, PhoneVault, SessionRegistry, TranscriptionClient,
    TriageService, WebhookValidator,
};

/// Application state containing all services and shared resources
///
/// This struct centralizes service initialization and makes it easy to
/// inject dependencies into Actix-web handlers.
pub struct AppState {
    /// Runtime configuration
    pub config: Config,
    /// Database connection pool
    pub db_pool: Arc<PgPool>,
    /// Call log and alert persistence
    pub storage: Arc<dyn Storage>,
    /// Phone hashing, encryption and masking
    pub vault: PhoneVault,
    /// In-flight call bookkeeping
    pub sessions: SessionRegistry,
    /// Triage analysis pipeline
    pub triage: TriageService,
    /// Alert creation and break-glass orchestration
    pub escalation: EscalationService,
    /// Real-time alert fan-out
    pub broadcaster: AlertBroadcaster,
    /// Webhook signature validation
    pub webhook_validator: WebhookValidator,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Database connection and schema initialization
    /// 2. Phone vault setup from environment
    /// 3. LLM and speech client initialization (optional, OPENAI_API_KEY)
    /// 4. Service dependency graph construction
    pub async fn new(config: Config) -> Result<Self, AppError> {
        // Initialize PostgreSQL database
        let db_pool = crate::db::create_pool()
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        // Initialize database schema
        crate::db::init_schema(&db_pool)
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(db_pool.clone()));

        let vault = PhoneVault::from_env().map_err(|e| AppError::InvalidConfig(e.to_string()))?;

        // OpenAI is optional; without it every analysis is the fixed fallback
        let (llm_client, transcriber) = match std::env::var("OPENAI_API_KEY") {
            Ok(api_key) => {
                let llm = LlmClient::new(&api_key)
                    .map_err(|e| AppError::InvalidConfig(e.to_string()))?;
                let transcriber = TranscriptionClient::new(&api_key);
                (Some(llm), Some(transcriber))
            }
            Err(_) => {
                tracing::warn!(
                    "OPENAI_API_KEY not set, triage will use the fixed fallback analysis"
                );
                (None, None)
            }
        };

        let triage = TriageService::new(llm_client, transcriber);

        let broadcaster = AlertBroadcaster::new();

        let escalation =
            EscalationService::new(Arc::clone(&storage), vault.clone(), broadcaster.clone());

        Ok(Self {
            config,
            db_pool: Arc::new(db_pool),
            storage,
            vault,
            sessions: SessionRegistry::new(),
            triage,
            escalation,
            broadcaster,
            webhook_validator: WebhookValidator::from_env(),
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Database initialization failed
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
