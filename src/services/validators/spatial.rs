//! Spatial validator: PostGIS prerequisites, GIST indexes, SRID consistency
//!
//! Only invoked when the script mentions spatial syntax; see
//! [`rules::mentions_spatial`].

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

use super::{or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{Severity, ValidationCategory, ValidationResult, ValidationStatus};

static SRID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSRID\s*=\s*(\d+)").expect("valid SRID pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialValidator;

/// Distinct `SRID=<n>` values in first-seen order
pub fn declared_srids(sql: &str) -> Vec<u32> {
    let mut srids = Vec::new();
    for caps in SRID_RE.captures_iter(sql) {
        if let Ok(srid) = caps[1].parse::<u32>() {
            if !srids.contains(&srid) {
                srids.push(srid);
            }
        }
    }
    srids
}

#[async_trait]
impl CategoryValidator for SpatialValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Spatial
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let mut results = rules::evaluate(ValidationCategory::Spatial, ctx.sql());

        let srids = declared_srids(ctx.sql());
        if srids.len() > 1 {
            let listed = srids
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            results.push(
                ValidationResult::new(
                    ValidationCategory::Spatial,
                    "srid_consistency_check",
                    Severity::Warning,
                    ValidationStatus::Warning,
                    format!("Multiple SRIDs in use ({}), ensure SRID consistency", listed),
                )
                .with_details(json!({ "srids": srids }))
                .with_recommendations(["Transform geometries to a single SRID with ST_Transform"]),
            );
        }

        or_passed(results, ValidationCategory::Spatial, "Spatial validation passed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MigrationSource;
    use crate::services::validators::ValidationSettings;

    async fn run(sql: &str) -> Vec<ValidationResult> {
        let source = MigrationSource::new("m", sql, "migrations/m.sql");
        let settings = ValidationSettings::default();
        SpatialValidator
            .validate(&ValidationContext::new(&source, &settings))
            .await
    }

    #[test]
    fn test_declared_srids_dedupes_in_order() {
        let sql = "SRID=4326;POINT(0 0) srid = 3857 SRID=4326";
        assert_eq!(declared_srids(sql), vec![4326, 3857]);
        assert!(declared_srids("CREATE TABLE t (id int)").is_empty());
    }

    #[tokio::test]
    async fn test_well_formed_spatial_migration_passes() {
        let results = run(
            "CREATE EXTENSION IF NOT EXISTS postgis;\n\
             CREATE TABLE depots (id int PRIMARY KEY, location geometry(Point, 4326));\n\
             CREATE INDEX CONCURRENTLY depots_location ON depots USING GIST (location);",
        )
        .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_name, "spatial_validation");
    }

    #[tokio::test]
    async fn test_missing_extension_and_index() {
        let results = run("ALTER TABLE depots ADD COLUMN location geometry(Point, 4326);").await;
        let names: Vec<_> = results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["postgis_extension_check", "spatial_index_check"]);
    }

    #[tokio::test]
    async fn test_mixed_srids_warn() {
        let results = run(
            "CREATE EXTENSION IF NOT EXISTS postgis;\n\
             INSERT INTO depots (location) VALUES ('SRID=4326;POINT(1 2)');\n\
             INSERT INTO depots (location) VALUES ('SRID=3857;POINT(1 2)');",
        )
        .await;
        assert_eq!(results.len(), 1);
        let finding = &results[0];
        assert_eq!(finding.test_name, "srid_consistency_check");
        assert!(finding.message.contains("ensure SRID consistency"));
        assert_eq!(finding.details.as_ref().unwrap()["srids"], json!([4326, 3857]));
    }
}
