//! Local filesystem lookups

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::FileLookup;
use crate::error::CollaboratorError;

/// Checks paths on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileLookup;

#[async_trait]
impl FileLookup for LocalFileLookup {
    async fn exists(&self, path: &Path) -> Result<bool, CollaboratorError> {
        debug!("Checking {}", path.display());
        fs::try_exists(path)
            .await
            .map_err(|e| CollaboratorError::Filesystem {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}
