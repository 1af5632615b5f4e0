//! Performance validator: operations likely to lock tables or degrade throughput

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::{bounded, or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{Severity, ValidationCategory, ValidationResult, ValidationStatus};
use crate::infrastructure::DatabaseMetadata;

pub struct PerformanceValidator {
    metadata: Arc<dyn DatabaseMetadata>,
}

impl PerformanceValidator {
    pub fn new(metadata: Arc<dyn DatabaseMetadata>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl CategoryValidator for PerformanceValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Performance
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let mut results = rules::evaluate(ValidationCategory::Performance, ctx.sql());
        let threshold = ctx.settings.pool_utilization_warn_percent;

        match bounded(
            "connection pool stats lookup",
            ctx.settings.collaborator_timeout,
            self.metadata.connection_pool_stats(),
        )
        .await
        {
            Ok(stats) if stats.utilization_percent > threshold => {
                results.push(
                    ValidationResult::new(
                        ValidationCategory::Performance,
                        "connection_pool_check",
                        Severity::Warning,
                        ValidationStatus::Warning,
                        format!(
                            "Connection pool utilization is {}% (threshold {}%)",
                            stats.utilization_percent, threshold
                        ),
                    )
                    .with_details(json!({
                        "poolStats": stats,
                        "thresholdPercent": threshold,
                    }))
                    .with_recommendations([
                        "Run the migration during a low-traffic window",
                        "Drain or scale connection consumers before migrating",
                    ]),
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Connection pool lookup failed: {}", e);
                results.push(ValidationResult::validator_error(
                    ValidationCategory::Performance,
                    format!("Connection pool lookup failed: {}", e),
                ));
            }
        }

        or_passed(
            results,
            ValidationCategory::Performance,
            "Performance validation passed",
        )
    }
}
