//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - PostgreSQL metadata (connection pool utilization, server version)
//! - Local filesystem (rollback script lookups)
//! - Wall clock
//!
//! Every collaborator call is fallible at the type level; callers decide how
//! a failure is reported.

pub mod clock;
pub mod filesystem;
pub mod postgres;
pub mod static_metadata;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CollaboratorError;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use filesystem::LocalFileLookup;
pub use postgres::PostgresMetadata;
pub use static_metadata::StaticMetadata;

/// Connection pool utilization snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// 0..=100
    pub utilization_percent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl PoolStats {
    /// Snapshot computed from live counts
    pub fn from_counts(active: u32, max: u32) -> Self {
        let utilization_percent = if max == 0 {
            0
        } else {
            ((u64::from(active) * 100) / u64::from(max)).min(100) as u32
        };
        Self {
            utilization_percent,
            active_connections: Some(active),
            max_connections: Some(max),
        }
    }
}

/// Live database metadata
#[async_trait]
pub trait DatabaseMetadata: Send + Sync {
    async fn connection_pool_stats(&self) -> Result<PoolStats, CollaboratorError>;

    /// Engine version string with a parseable leading integer (e.g. "15.4")
    async fn engine_version(&self) -> Result<String, CollaboratorError>;
}

/// Filesystem existence checks
#[async_trait]
pub trait FileLookup: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_from_counts() {
        assert_eq!(PoolStats::from_counts(45, 100).utilization_percent, 45);
        assert_eq!(PoolStats::from_counts(9, 10).utilization_percent, 90);
        assert_eq!(PoolStats::from_counts(12, 10).utilization_percent, 100);
        assert_eq!(PoolStats::from_counts(3, 0).utilization_percent, 0);
    }

    #[test]
    fn test_pool_stats_serialization() {
        let json = serde_json::to_value(PoolStats::from_counts(85, 100)).unwrap();
        assert_eq!(json["utilizationPercent"], 85);
        assert_eq!(json["maxConnections"], 100);
    }
}
