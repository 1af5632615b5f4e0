//! Data integrity validator: constraint signals and data-loss risk
//!
//! Only the first data-loss pattern found is reported; later ones are not
//! checked once one fires.

use async_trait::async_trait;

use super::{or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{ValidationCategory, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct DataIntegrityValidator;

#[async_trait]
impl CategoryValidator for DataIntegrityValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::DataIntegrity
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        or_passed(
            rules::evaluate(ValidationCategory::DataIntegrity, ctx.sql()),
            ValidationCategory::DataIntegrity,
            "Data integrity validation passed",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MigrationSource, Severity, ValidationStatus};
    use crate::services::validators::ValidationSettings;

    async fn run(sql: &str) -> Vec<ValidationResult> {
        let source = MigrationSource::new("m", sql, "migrations/m.sql");
        let settings = ValidationSettings::default();
        DataIntegrityValidator
            .validate(&ValidationContext::new(&source, &settings))
            .await
    }

    #[tokio::test]
    async fn test_clean_script_passes_once() {
        let results = run("CREATE TABLE t (id int PRIMARY KEY);").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "data_integrity_validation");
    }

    #[tokio::test]
    async fn test_positive_constraint_signals() {
        let results = run(
            "CREATE TABLE pickups (\n\
               id int PRIMARY KEY,\n\
               weight_kg numeric CHECK (weight_kg >= 0),\n\
               bin_id int, FOREIGN KEY (bin_id) REFERENCES bins (id)\n\
             );",
        )
        .await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.status == ValidationStatus::Passed && r.severity == Severity::Info));
    }

    #[tokio::test]
    async fn test_single_data_loss_warning() {
        let results = run("DELETE FROM bins WHERE retired; TRUNCATE TABLE pickups;").await;
        let loss: Vec<_> = results
            .iter()
            .filter(|r| r.test_name == "data_loss_risk")
            .collect();
        assert_eq!(loss.len(), 1);
        assert_eq!(loss[0].severity, Severity::Warning);
        assert!(loss[0].message.contains("TRUNCATE TABLE"));
        assert!(loss[0].message.contains("verify backup"));
    }
}
