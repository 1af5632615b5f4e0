//! PostgreSQL metadata adapter
//!
//! Reads connection utilization from `pg_stat_activity` and the server
//! version from `SHOW server_version`. The pool connects lazily so an
//! unreachable server surfaces as a failed lookup, not a startup error.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};

use super::{DatabaseMetadata, PoolStats};
use crate::error::CollaboratorError;

const POOL_STATS_QUERY: &str = "SELECT count(*)::int4 AS active, \
     current_setting('max_connections')::int4 AS max_connections \
     FROM pg_stat_activity";

/// Database metadata backed by a live PostgreSQL server
#[derive(Debug, Clone)]
pub struct PostgresMetadata {
    pool: PgPool,
}

impl PostgresMetadata {
    /// Create a lazily-connecting pool for metadata queries
    pub fn connect_lazy(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        info!("Using live database metadata");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseMetadata for PostgresMetadata {
    async fn connection_pool_stats(&self) -> Result<PoolStats, CollaboratorError> {
        let row = sqlx::query(POOL_STATS_QUERY).fetch_one(&self.pool).await?;
        let active: i32 = row.try_get("active")?;
        let max: i32 = row.try_get("max_connections")?;

        if active < 0 || max < 0 {
            return Err(CollaboratorError::InvalidResponse {
                operation: "connection pool stats".to_string(),
                message: format!("negative counts: active={}, max={}", active, max),
            });
        }

        let stats = PoolStats::from_counts(active as u32, max as u32);
        debug!(
            "Connection utilization {}% ({}/{})",
            stats.utilization_percent, active, max
        );
        Ok(stats)
    }

    async fn engine_version(&self) -> Result<String, CollaboratorError> {
        let version: String = sqlx::query_scalar("SHOW server_version")
            .fetch_one(&self.pool)
            .await?;
        debug!("Server version {}", version);
        Ok(version)
    }
}
