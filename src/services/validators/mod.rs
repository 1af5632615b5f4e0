//! Category validators
//!
//! One type per [`ValidationCategory`], all invoked uniformly by the
//! orchestrator through [`CategoryValidator`]. A validator never fails: any
//! collaborator error is caught here and reported as a Critical finding.

mod ai_ml;
mod compatibility;
mod integrity;
mod performance;
mod rollback;
mod schema;
mod security;
mod spatial;

pub use ai_ml::AiMlValidator;
pub use compatibility::{leading_major_version, CompatibilityValidator};
pub use integrity::DataIntegrityValidator;
pub use performance::PerformanceValidator;
pub use rollback::{rollback_path, RollbackValidator};
pub use schema::SchemaValidator;
pub use security::SecurityValidator;
pub use spatial::SpatialValidator;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::domain::{MigrationSource, ValidationCategory, ValidationResult};
use crate::error::CollaboratorError;

/// Tunables shared by all validators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Warn when connection utilization is strictly above this
    pub pool_utilization_warn_percent: u32,
    /// First engine major version supporting `GENERATED ALWAYS AS`
    pub min_generated_columns_version: u32,
    /// Directory segment holding migrations (`.../migrations/001.sql`)
    pub migrations_segment: String,
    /// Directory segment substituted to locate rollbacks
    pub rollbacks_segment: String,
    /// Upper bound on each collaborator lookup
    pub collaborator_timeout: Duration,
    /// Test names re-emitted as Skipped/Info
    pub suppressed_checks: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            pool_utilization_warn_percent: 80,
            min_generated_columns_version: 12,
            migrations_segment: "migrations".to_string(),
            rollbacks_segment: "rollbacks".to_string(),
            collaborator_timeout: Duration::from_secs(5),
            suppressed_checks: Vec::new(),
        }
    }
}

/// Inputs visible to every validator
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub source: &'a MigrationSource,
    pub settings: &'a ValidationSettings,
}

impl<'a> ValidationContext<'a> {
    pub fn new(source: &'a MigrationSource, settings: &'a ValidationSettings) -> Self {
        Self { source, settings }
    }

    pub fn sql(&self) -> &'a str {
        &self.source.content
    }
}

/// Analyzer for one category of migration risk
#[async_trait]
pub trait CategoryValidator: Send + Sync {
    fn category(&self) -> ValidationCategory;

    /// Findings for this category; never empty
    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult>;
}

/// Run a collaborator lookup under the configured timeout
pub(crate) async fn bounded<T, F>(
    operation: &str,
    timeout: Duration,
    lookup: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout {
            operation: operation.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Append the Passed/Info summary when nothing fired
pub(crate) fn or_passed(
    mut results: Vec<ValidationResult>,
    category: ValidationCategory,
    message: &str,
) -> Vec<ValidationResult> {
    if results.is_empty() {
        results.push(ValidationResult::passed(category, message));
    }
    results
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded("lookup", Duration::from_secs(1), async { Ok::<_, CollaboratorError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded("slow lookup", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CollaboratorError>(())
        })
        .await;

        assert_eq!(
            result,
            Err(CollaboratorError::Timeout {
                operation: "slow lookup".to_string(),
                timeout_ms: 10,
            })
        );
    }

    #[test]
    fn test_or_passed_only_when_empty() {
        let passed = or_passed(Vec::new(), ValidationCategory::Security, "ok");
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].test_name, "security_validation");

        let kept = or_passed(passed.clone(), ValidationCategory::Security, "ok");
        assert_eq!(kept, passed);
    }
}
