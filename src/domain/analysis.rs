//! Migration analysis report and gate verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

use super::finding::{Severity, ValidationCategory, ValidationResult};

/// Coarse complexity bucket derived from operation counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{}", name)
    }
}

/// How reversible a migration is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackComplexity {
    Simple,
    Complex,
    Impossible,
}

impl fmt::Display for RollbackComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
            Self::Impossible => "impossible",
        };
        write!(f, "{}", name)
    }
}

/// Structural operation tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCounts {
    pub table_operations: u32,
    pub index_operations: u32,
    pub data_operations: u32,
    pub constraint_operations: u32,
}

impl OperationCounts {
    pub fn total(&self) -> u32 {
        self.table_operations
            + self.index_operations
            + self.data_operations
            + self.constraint_operations
    }
}

/// The final report for one validated migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationAnalysis {
    pub migration_id: String,
    pub complexity: Complexity,
    pub estimated_duration_seconds: u32,
    /// 0..=100, saturating
    pub risk_score: u8,
    pub requires_downtime: bool,
    pub impacted_tables: Vec<String>,
    pub impacted_indexes: Vec<String>,
    pub connection_pool_impact_percent: u8,
    pub data_volume_impact_score: u32,
    pub rollback_complexity: RollbackComplexity,
    pub operation_counts: OperationCounts,
    /// Categories whose validator ran, in invocation order
    pub executed_categories: Vec<ValidationCategory>,
    pub validation_results: Vec<ValidationResult>,
}

impl MigrationAnalysis {
    pub fn total_operations(&self) -> u32 {
        self.operation_counts.total()
    }

    pub fn has_critical(&self) -> bool {
        self.validation_results.iter().any(|r| r.is_critical())
    }

    /// Number of results at the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.validation_results
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    pub fn results_for(&self, category: ValidationCategory) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results
            .iter()
            .filter(move |r| r.category == category)
    }

    /// Evaluate the report against gate thresholds
    pub fn verdict(&self, max_risk_score: u8, fail_on_critical: bool) -> GateVerdict {
        let mut reasons = Vec::new();

        if self.risk_score > max_risk_score {
            reasons.push(format!(
                "risk score {} exceeds threshold {}",
                self.risk_score, max_risk_score
            ));
        }

        if fail_on_critical {
            for result in self.validation_results.iter().filter(|r| r.is_critical()) {
                reasons.push(format!(
                    "critical finding {}: {}",
                    result.test_name, result.message
                ));
            }
        }

        GateVerdict {
            migration_id: self.migration_id.clone(),
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

/// Whether a migration may proceed to a live system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    pub migration_id: String,
    pub passed: bool,
    pub reasons: Vec<String>,
}
