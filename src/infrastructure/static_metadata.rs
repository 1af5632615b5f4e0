//! Fixed database metadata for offline runs (no database reachable from CI)

use async_trait::async_trait;

use super::{DatabaseMetadata, PoolStats};
use crate::error::CollaboratorError;

/// Reports configured values instead of querying a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMetadata {
    pub engine_version: String,
    pub utilization_percent: u32,
}

impl StaticMetadata {
    pub fn new(engine_version: impl Into<String>, utilization_percent: u32) -> Self {
        Self {
            engine_version: engine_version.into(),
            utilization_percent: utilization_percent.min(100),
        }
    }
}

#[async_trait]
impl DatabaseMetadata for StaticMetadata {
    async fn connection_pool_stats(&self) -> Result<PoolStats, CollaboratorError> {
        Ok(PoolStats {
            utilization_percent: self.utilization_percent,
            active_connections: None,
            max_connections: None,
        })
    }

    async fn engine_version(&self) -> Result<String, CollaboratorError> {
        Ok(self.engine_version.clone())
    }
}
