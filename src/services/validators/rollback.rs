//! Rollback validator: every migration needs a companion rollback script
//!
//! The expected location swaps the first `migrations` directory of the path
//! for `rollbacks`, keeping everything else:
//! `db/migrations/001_init.sql` -> `db/rollbacks/001_init.sql`.
//! With nested directories only the outermost one is swapped, so
//! `migrations/app/migrations/002.sql` -> `rollbacks/app/migrations/002.sql`.

use async_trait::async_trait;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{bounded, CategoryValidator, ValidationContext};
use crate::domain::{Severity, ValidationCategory, ValidationResult, ValidationStatus};
use crate::infrastructure::FileLookup;

const TEST_NAME: &str = "rollback_script_check";

/// Derive the rollback script path for a migration
///
/// Matches whole directory components only; returns `None` when no parent
/// directory is named `migrations_segment`.
pub fn rollback_path(
    migration_path: &Path,
    migrations_segment: &str,
    rollbacks_segment: &str,
) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = migration_path.components().collect();
    let dirs = components.len().checked_sub(1)?;

    let position = components[..dirs]
        .iter()
        .position(|c| matches!(c, Component::Normal(name) if *name == migrations_segment))?;

    let mut rollback = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if i == position {
            rollback.push(rollbacks_segment);
        } else {
            rollback.push(component.as_os_str());
        }
    }
    Some(rollback)
}

pub struct RollbackValidator {
    files: Arc<dyn FileLookup>,
}

impl RollbackValidator {
    pub fn new(files: Arc<dyn FileLookup>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl CategoryValidator for RollbackValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Rollback
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let settings = ctx.settings;
        let Some(expected) = rollback_path(
            &ctx.source.path,
            &settings.migrations_segment,
            &settings.rollbacks_segment,
        ) else {
            return vec![ValidationResult::new(
                ValidationCategory::Rollback,
                TEST_NAME,
                Severity::Warning,
                ValidationStatus::Warning,
                format!(
                    "Cannot derive a rollback path: {} has no '{}' directory",
                    ctx.source.path.display(),
                    settings.migrations_segment
                ),
            )
            .with_recommendations([format!(
                "Keep migrations under a '{}' directory with rollbacks alongside in '{}'",
                settings.migrations_segment, settings.rollbacks_segment
            )])];
        };

        debug!("Checking rollback script {}", expected.display());
        let details = json!({ "rollbackPath": expected.display().to_string() });

        match bounded(
            "rollback script lookup",
            settings.collaborator_timeout,
            self.files.exists(&expected),
        )
        .await
        {
            Ok(true) => vec![ValidationResult::new(
                ValidationCategory::Rollback,
                TEST_NAME,
                Severity::Info,
                ValidationStatus::Passed,
                "Rollback script found",
            )
            .with_details(details)],
            Ok(false) => vec![ValidationResult::new(
                ValidationCategory::Rollback,
                TEST_NAME,
                Severity::Warning,
                ValidationStatus::Warning,
                format!(
                    "No rollback script at {}, create a corresponding rollback migration",
                    expected.display()
                ),
            )
            .with_details(details)
            .with_recommendations(["Create a corresponding rollback migration"])],
            Err(e) => {
                warn!("Rollback lookup failed: {}", e);
                vec![ValidationResult::validator_error(
                    ValidationCategory::Rollback,
                    format!("Rollback script check failed: {}", e),
                )
                .with_details(details)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MigrationSource;
    use crate::services::validators::fakes::FakeFiles;
    use crate::services::validators::ValidationSettings;

    async fn run(path: &str, files: Arc<FakeFiles>) -> Vec<ValidationResult> {
        let source = MigrationSource::new("001_init", "CREATE TABLE t (id int PRIMARY KEY);", path);
        let settings = ValidationSettings::default();
        RollbackValidator::new(files)
            .validate(&ValidationContext::new(&source, &settings))
            .await
    }

    #[test]
    fn test_rollback_path_swaps_directory_component() {
        assert_eq!(
            rollback_path(Path::new("/srv/db/migrations/001_init.sql"), "migrations", "rollbacks"),
            Some(PathBuf::from("/srv/db/rollbacks/001_init.sql"))
        );
        assert_eq!(
            rollback_path(Path::new("migrations/001_init.sql"), "migrations", "rollbacks"),
            Some(PathBuf::from("rollbacks/001_init.sql"))
        );
    }

    #[test]
    fn test_rollback_path_ignores_substrings_and_file_name() {
        assert_eq!(
            rollback_path(Path::new("/srv/old_migrations/001.sql"), "migrations", "rollbacks"),
            None
        );
        assert_eq!(
            rollback_path(Path::new("/srv/sql/migrations"), "migrations", "rollbacks"),
            None
        );
    }

    #[test]
    fn test_rollback_path_swaps_outermost_directory() {
        assert_eq!(
            rollback_path(
                Path::new("/migrations/app/migrations/002_add.sql"),
                "migrations",
                "rollbacks"
            ),
            Some(PathBuf::from("/rollbacks/app/migrations/002_add.sql"))
        );
    }

    #[tokio::test]
    async fn test_checks_exact_rollback_path() {
        let files = Arc::new(FakeFiles::with(&[]));
        run("/srv/db/migrations/001_init.sql", files.clone()).await;
        assert_eq!(
            files.checked(),
            vec![PathBuf::from("/srv/db/rollbacks/001_init.sql")]
        );
    }

    #[tokio::test]
    async fn test_existing_rollback_passes() {
        let files = Arc::new(FakeFiles::with(&["/srv/db/rollbacks/001_init.sql"]));
        let results = run("/srv/db/migrations/001_init.sql", files).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ValidationStatus::Passed);
        assert_eq!(results[0].severity, Severity::Info);
        assert_eq!(
            results[0].details.as_ref().unwrap()["rollbackPath"],
            "/srv/db/rollbacks/001_init.sql"
        );
    }

    #[tokio::test]
    async fn test_missing_rollback_warns() {
        let results = run("/srv/db/migrations/001_init.sql", Arc::new(FakeFiles::with(&[]))).await;
        assert_eq!(results[0].severity, Severity::Warning);
        assert!(results[0]
            .message
            .contains("create a corresponding rollback migration"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_critical() {
        let results = run(
            "/srv/db/migrations/001_init.sql",
            Arc::new(FakeFiles::failing("permission denied")),
        )
        .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "rollback_validation_error");
        assert_eq!(results[0].severity, Severity::Critical);
        assert!(results[0].message.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_underivable_path_warns_without_probing() {
        let files = Arc::new(FakeFiles::with(&[]));
        let results = run("/srv/sql/001_init.sql", files.clone()).await;
        assert_eq!(results[0].test_name, "rollback_script_check");
        assert_eq!(results[0].severity, Severity::Warning);
        assert!(files.checked().is_empty());
    }
}
