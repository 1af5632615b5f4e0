//! Validation service - the orchestrator
//!
//! Runs the category validators in a fixed order against one migration,
//! stamps and filters their results, then hands everything to the analyzer.
//! Holds no mutable state, so one instance can serve concurrent callers.

use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{analyzer, rules, MigrationAnalysis, MigrationSource, ValidationResult};
use crate::infrastructure::{Clock, DatabaseMetadata, FileLookup, SystemClock};
use crate::services::validators::{
    AiMlValidator, CategoryValidator, CompatibilityValidator, DataIntegrityValidator,
    PerformanceValidator, RollbackValidator, SchemaValidator, SecurityValidator, SpatialValidator,
    ValidationContext, ValidationSettings,
};

/// When a validator runs
#[derive(Clone, Copy)]
enum Invocation {
    Always,
    /// Only when the keyword sniff matches the script
    WhenMentioned(fn(&str) -> bool),
}

impl Invocation {
    fn applies(&self, sql: &str) -> bool {
        match self {
            Self::Always => true,
            Self::WhenMentioned(sniff) => sniff(sql),
        }
    }
}

type Stage = (Invocation, Box<dyn CategoryValidator>);

fn stage(invocation: Invocation, validator: impl CategoryValidator + 'static) -> Stage {
    (invocation, Box::new(validator))
}

/// Service that validates migrations before they reach a live database
pub struct ValidationService {
    pipeline: Vec<Stage>,
    settings: ValidationSettings,
    clock: Arc<dyn Clock>,
}

impl ValidationService {
    /// Create a new validation service using the system clock
    pub fn new(
        metadata: Arc<dyn DatabaseMetadata>,
        files: Arc<dyn FileLookup>,
        settings: ValidationSettings,
    ) -> Self {
        let pipeline = vec![
            stage(Invocation::Always, SchemaValidator),
            stage(Invocation::Always, PerformanceValidator::new(metadata.clone())),
            stage(Invocation::Always, DataIntegrityValidator),
            stage(Invocation::Always, SecurityValidator),
            stage(Invocation::WhenMentioned(rules::mentions_spatial), SpatialValidator),
            stage(Invocation::WhenMentioned(rules::mentions_ai_ml), AiMlValidator),
            stage(Invocation::Always, RollbackValidator::new(files)),
            stage(Invocation::Always, CompatibilityValidator::new(metadata)),
        ];

        Self {
            pipeline,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builder: use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Validate one migration and produce its analysis report
    ///
    /// Collaborator failures are already findings by the time they reach
    /// here, so this never fails.
    pub async fn validate(&self, source: &MigrationSource) -> MigrationAnalysis {
        info!("Validating migration {}", source.migration_id);

        let ctx = ValidationContext::new(source, &self.settings);
        let mut executed = Vec::new();
        let mut results: Vec<ValidationResult> = Vec::new();

        for (invocation, validator) in &self.pipeline {
            let category = validator.category();
            if !invocation.applies(ctx.sql()) {
                debug!("Skipping {} validator: no trigger keywords", category);
                continue;
            }

            let started = self.clock.now();
            let mut produced = validator.validate(&ctx).await;
            let finished = self.clock.now();
            let elapsed_ms = (finished - started).num_milliseconds().max(0) as u64;

            if produced.is_empty() {
                produced.push(ValidationResult::passed(
                    category,
                    format!("{} validation passed", category),
                ));
            }

            debug!(
                "{} validator produced {} result(s) in {}ms",
                category,
                produced.len(),
                elapsed_ms
            );

            executed.push(category);
            results.extend(produced.into_iter().map(|result| {
                let result = result.stamped(finished, elapsed_ms);
                if self.is_suppressed(&result) {
                    result.suppressed()
                } else {
                    result
                }
            }));
        }

        let analysis = analyzer::analyze(&source.migration_id, &source.content, executed, results);

        info!(
            "Migration {}: risk {} complexity {} ({} operations)",
            analysis.migration_id,
            analysis.risk_score,
            analysis.complexity,
            analysis.total_operations()
        );

        analysis
    }

    fn is_suppressed(&self, result: &ValidationResult) -> bool {
        self.settings
            .suppressed_checks
            .iter()
            .any(|name| *name == result.test_name)
    }
}
