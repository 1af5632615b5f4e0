//! Compatibility validator: syntax the running engine may not support

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::warn;

use super::{bounded, CategoryValidator, ValidationContext};
use crate::domain::{Severity, ValidationCategory, ValidationResult, ValidationStatus};
use crate::infrastructure::DatabaseMetadata;

static GENERATED_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bGENERATED\s+ALWAYS\s+AS\b").expect("valid generated column pattern")
});

/// Leading integer of a version string ("15.4 (Debian)" -> 15)
pub fn leading_major_version(version: &str) -> Option<u32> {
    let digits: String = version
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub struct CompatibilityValidator {
    metadata: Arc<dyn DatabaseMetadata>,
}

impl CompatibilityValidator {
    pub fn new(metadata: Arc<dyn DatabaseMetadata>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl CategoryValidator for CompatibilityValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Compatibility
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let minimum = ctx.settings.min_generated_columns_version;

        let version = match bounded(
            "engine version lookup",
            ctx.settings.collaborator_timeout,
            self.metadata.engine_version(),
        )
        .await
        {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("Engine version lookup failed: {}", e);
                results.push(ValidationResult::validator_error(
                    ValidationCategory::Compatibility,
                    format!("Engine version lookup failed: {}", e),
                ));
                None
            }
        };

        if let Some(version) = &version {
            match leading_major_version(version) {
                Some(major) if major < minimum && GENERATED_COLUMN_RE.is_match(ctx.sql()) => {
                    results.push(
                        ValidationResult::new(
                            ValidationCategory::Compatibility,
                            "generated_columns_check",
                            Severity::Error,
                            ValidationStatus::Failed,
                            format!(
                                "GENERATED ALWAYS AS requires engine version {}+, running {}",
                                minimum, version
                            ),
                        )
                        .with_details(json!({
                            "currentVersion": version,
                            "requiredMajorVersion": minimum,
                        }))
                        .with_recommendations([
                            "Upgrade the engine before applying this migration",
                            "Replace the generated column with a trigger-maintained column",
                        ]),
                    );
                }
                Some(_) => {}
                None => results.push(
                    ValidationResult::new(
                        ValidationCategory::Compatibility,
                        "engine_version_check",
                        Severity::Warning,
                        ValidationStatus::Warning,
                        format!("Cannot parse engine version '{}'", version),
                    )
                    .with_details(json!({ "currentVersion": version })),
                ),
            }
        }

        let summary = ValidationResult::passed(
            ValidationCategory::Compatibility,
            "Compatibility validation completed",
        );
        results.push(match version {
            Some(version) => summary.with_details(json!({ "currentVersion": version })),
            None => summary,
        });
        results
    }
}
