//! Database module for PostgreSQL persistence

pub mod memory;
pub mod models;
pub mod storage;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;

// Environment variable names
const ENV_POSTGRES_HOST: &str = "MAITRI_POSTGRES_HOST";
const ENV_POSTGRES_PORT: &str = "MAITRI_POSTGRES_PORT";
const ENV_POSTGRES_USER: &str = "MAITRI_POSTGRES_USER";
const ENV_POSTGRES_PASSWORD: &str = "MAITRI_POSTGRES_PASSWORD";
const ENV_POSTGRES_DB: &str = "MAITRI_POSTGRES_DB";

// Default values
const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const DEFAULT_POSTGRES_PORT: &str = "5432";
const DEFAULT_POSTGRES_USER: &str = "maitri";
const DEFAULT_POSTGRES_PASSWORD: &str = "maitri";
const DEFAULT_POSTGRES_DB: &str = "maitri";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Create a new database connection pool
pub async fn create_pool() -> Result<PgPool, DbError> {
    let host = env::var(ENV_POSTGRES_HOST).unwrap_or_else(|_| DEFAULT_POSTGRES_HOST.to_string());
    let port = env::var(ENV_POSTGRES_PORT).unwrap_or_else(|_| DEFAULT_POSTGRES_PORT.to_string());
    let user = env::var(ENV_POSTGRES_USER).unwrap_or_else(|_| DEFAULT_POSTGRES_USER.to_string());
    let password =
        env::var(ENV_POSTGRES_PASSWORD).unwrap_or_else(|_| DEFAULT_POSTGRES_PASSWORD.to_string());
    let database = env::var(ENV_POSTGRES_DB).unwrap_or_else(|_| DEFAULT_POSTGRES_DB.to_string());

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, database
    );

    tracing::debug!(host = %host, port = %port, database = %database, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!(host = %host, port = %port, "PostgreSQL connection established");

    Ok(pool)
}

/// Initialize database schema
pub async fn init_schema(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_logs (
            id VARCHAR(64) PRIMARY KEY,
            caller_hash VARCHAR(64) NOT NULL,
            encrypted_phone TEXT,
            transcription TEXT,
            ai_response TEXT,
            severity_level INTEGER NOT NULL DEFAULT 0,
            category VARCHAR(20) NOT NULL DEFAULT 'General',
            is_break_glass BOOLEAN NOT NULL DEFAULT FALSE,
            village_location TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id VARCHAR(64) PRIMARY KEY,
            call_id VARCHAR(64) NOT NULL REFERENCES call_logs(id),
            asha_worker_id VARCHAR(64),
            status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
            emergency_reason TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            resolved_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes separately
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_call_logs_caller_hash ON call_logs(caller_hash)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_call_logs_created_at ON call_logs(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_call_id ON alerts(call_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database schema initialized");

    Ok(())
}
