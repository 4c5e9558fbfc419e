use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

pub type DbResult<T> = Result<T, DatabaseError>;

/// Represents an established database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Database health status
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DBHealthStatus {
    Healthy,
    Unhealthy,
}

/// Database information
#[derive(Debug, Clone, Deserialize, Serialize, FromRow)]
pub struct DbInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Complete database health check result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseHealth {
    pub status: DBHealthStatus,
    pub response_time_ms: u64,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_info: Option<DbInfo>,
}

impl Database {
    /// Create a new database connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Initializing database connection");
        debug!(
            "Database configuration: max_conn={}, min_conn={}, timeout={}s",
            config.max_connections, config.min_connections, config.connect_timeout_seconds
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                DatabaseError::ConnectionError(e)
            })?;

        info!("Successfully connected to database");

        if config.use_migrations {
            Self::run_migrations(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> DatabaseHealth {
        let start = std::time::Instant::now();

        let result = sqlx::query("SELECT 1 as result")
            .fetch_one(self.get_pool())
            .await;

        let elapsed = start.elapsed();

        match result {
            Ok(_) => {
                let db_info = sqlx::query_as::<_, DbInfo>(
                    "SELECT current_database() as name, version() as version",
                )
                .fetch_one(self.get_pool())
                .await
                .ok();

                DatabaseHealth {
                    status: DBHealthStatus::Healthy,
                    response_time_ms: elapsed.as_millis() as u64,
                    message: None,
                    db_info,
                }
            }
            Err(e) => DatabaseHealth {
                status: DBHealthStatus::Unhealthy,
                response_time_ms: elapsed.as_millis() as u64,
                message: Some(format!("Database query failed: {}", e)),
                db_info: None,
            },
        }
    }

    /// Run database migrations
    async fn run_migrations(pool: &PgPool) -> DbResult<()> {
        info!("Running database migrations");

        match sqlx::migrate!("./migrations").run(pool).await {
            Ok(_) => {
                info!("Database migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                warn!("Database migration error: {}", e);
                Err(DatabaseError::MigrationError(e.to_string()))
            }
        }
    }

    /// Gracefully close the database connection pool
    pub async fn shutdown(&self) {
        info!("Shutting down database connection pool...");

        let used_connections = self.pool.size();
        let idle_connections = self.pool.num_idle();

        self.pool.close().await;

        info!(
            "Database connection pool successfully closed. Stats: {} active, {} idle connections released",
            used_connections, idle_connections
        );
    }
}
