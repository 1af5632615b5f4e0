//! Security validator: dynamic SQL, hardcoded secrets, permission changes

use async_trait::async_trait;

use super::{or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{ValidationCategory, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityValidator;

#[async_trait]
impl CategoryValidator for SecurityValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Security
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        or_passed(
            rules::evaluate(ValidationCategory::Security, ctx.sql()),
            ValidationCategory::Security,
            "Security validation passed",
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
        SecurityValidator
            .validate(&ValidationContext::new(&source, &settings))
            .await
    }

    #[tokio::test]
    async fn test_clean_script_passes_once() {
        let results = run("CREATE TABLE t (id int PRIMARY KEY);").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ValidationStatus::Passed);
    }

    #[tokio::test]
    async fn test_hardcoded_secret_is_critical() {
        let results = run("CREATE ROLE reporting LOGIN PASSWORD = 'changeme';").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "hardcoded_secret");
        assert_eq!(results[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_dynamic_sql_and_grants() {
        let results = run(
            "DO $$ BEGIN EXECUTE 'ALTER TABLE ' || quote_ident(t) || ' OWNER TO app'; END $$;\n\
             GRANT SELECT ON ALL TABLES IN SCHEMA public TO reporting;",
        )
        .await;
        let names: Vec<_> = results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["dynamic_sql_injection", "permission_management"]);
        assert_eq!(results[1].severity, Severity::Info);
    }
}
