//! Complexity & Risk Analyzer
//!
//! Aggregates category findings and structural counts from the migration
//! text into a single [`MigrationAnalysis`]. Pure: the same inputs always
//! produce the same report.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::analysis::{Complexity, MigrationAnalysis, OperationCounts, RollbackComplexity};
use super::finding::{ValidationCategory, ValidationResult};
use super::rules::statements;

const MIN_DURATION_SECS: u32 = 30;
const SECS_PER_OPERATION: u32 = 10;
const DATA_VOLUME_PER_OPERATION: u32 = 10;
const DOWNTIME_POOL_IMPACT: u8 = 90;
const MAX_ONLINE_POOL_IMPACT: u32 = 50;

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid analyzer pattern {pattern:?}: {e}"))
}

// Keywords are matched as whole words, so a column like `updated_at` is not
// a data operation. `CREATE UNIQUE INDEX` counts as an index operation.
static TABLE_OPS: LazyLock<Regex> = LazyLock::new(|| ci(r"\b(CREATE|ALTER|DROP)\s+TABLE\b"));
static INDEX_OPS: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\b(CREATE|DROP)\s+(UNIQUE\s+)?INDEX\b"));
static DATA_OPS: LazyLock<Regex> = LazyLock::new(|| ci(r"\b(INSERT|UPDATE|DELETE)\b"));
static CONSTRAINT_OPS: LazyLock<Regex> = LazyLock::new(|| ci(r"\b(ADD|DROP)\s+CONSTRAINT\b"));

static TABLE_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    ci(r#"\b(?:CREATE|ALTER|DROP)\s+TABLE\s+(?:IF\s+(?:NOT\s+)?EXISTS\s+)?(?:ONLY\s+)?([\w."]+)"#)
});
static INDEX_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    ci(r#"\b(?:CREATE|DROP)\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+(?:NOT\s+)?EXISTS\s+)?([\w."]+)"#)
});

static ADD_NOT_NULL_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| ci(r"(?s)\bALTER\s+TABLE\b.*\bADD\s+COLUMN\b.*\bNOT\s+NULL\b"));
static DROP_TABLE: LazyLock<Regex> = LazyLock::new(|| ci(r"\bDROP\s+TABLE\b"));
static VACUUM_FULL: LazyLock<Regex> = LazyLock::new(|| ci(r"\bVACUUM\s+FULL\b"));
static IRREVERSIBLE: LazyLock<Regex> = LazyLock::new(|| ci(r"\b(DROP|TRUNCATE)\b"));

/// Sum severity weights over all results, clamped to 100
pub fn risk_score(results: &[ValidationResult]) -> u8 {
    let total = results
        .iter()
        .fold(0u32, |acc, r| acc.saturating_add(r.severity.risk_weight()));
    total.min(100) as u8
}

/// Count DDL/DML operations by kind
pub fn count_operations(sql: &str) -> OperationCounts {
    let count = |re: &Regex| re.find_iter(sql).count() as u32;
    OperationCounts {
        table_operations: count(&TABLE_OPS),
        index_operations: count(&INDEX_OPS),
        data_operations: count(&DATA_OPS),
        constraint_operations: count(&CONSTRAINT_OPS),
    }
}

pub fn complexity_for(total_operations: u32) -> Complexity {
    match total_operations {
        n if n > 20 => Complexity::Critical,
        n if n > 10 => Complexity::High,
        n if n > 5 => Complexity::Medium,
        _ => Complexity::Low,
    }
}

pub fn estimated_duration_seconds(total_operations: u32) -> u32 {
    total_operations
        .saturating_mul(SECS_PER_OPERATION)
        .max(MIN_DURATION_SECS)
}

/// Table rewrite, table removal, or VACUUM FULL
pub fn requires_downtime(sql: &str) -> bool {
    statements(sql).any(|stmt| ADD_NOT_NULL_COLUMN.is_match(stmt))
        || DROP_TABLE.is_match(sql)
        || VACUUM_FULL.is_match(sql)
}

pub fn connection_pool_impact(requires_downtime: bool, total_operations: u32) -> u8 {
    if requires_downtime {
        DOWNTIME_POOL_IMPACT
    } else {
        total_operations
            .saturating_mul(2)
            .min(MAX_ONLINE_POOL_IMPACT) as u8
    }
}

pub fn rollback_complexity(sql: &str, total_operations: u32) -> RollbackComplexity {
    if IRREVERSIBLE.is_match(sql) {
        RollbackComplexity::Impossible
    } else if total_operations > 10 {
        RollbackComplexity::Complex
    } else {
        RollbackComplexity::Simple
    }
}

/// Identifiers following CREATE/ALTER/DROP TABLE, first-seen order, no duplicates
pub fn impacted_tables(sql: &str) -> Vec<String> {
    collect_identifiers(&TABLE_NAMES, sql)
}

/// Identifiers following CREATE/DROP INDEX, first-seen order, no duplicates
pub fn impacted_indexes(sql: &str) -> Vec<String> {
    collect_identifiers(&INDEX_NAMES, sql)
        .into_iter()
        // unnamed index: CREATE INDEX ON t (...)
        .filter(|name| !name.eq_ignore_ascii_case("on"))
        .collect()
}

fn collect_identifiers(re: &Regex, sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in re.captures_iter(sql) {
        let name = caps[1].replace('"', "");
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Build the final report for one migration
pub fn analyze(
    migration_id: &str,
    sql: &str,
    executed_categories: Vec<ValidationCategory>,
    validation_results: Vec<ValidationResult>,
) -> MigrationAnalysis {
    let operation_counts = count_operations(sql);
    let total = operation_counts.total();
    let downtime = requires_downtime(sql);

    MigrationAnalysis {
        migration_id: migration_id.to_string(),
        complexity: complexity_for(total),
        estimated_duration_seconds: estimated_duration_seconds(total),
        risk_score: risk_score(&validation_results),
        requires_downtime: downtime,
        impacted_tables: impacted_tables(sql),
        impacted_indexes: impacted_indexes(sql),
        connection_pool_impact_percent: connection_pool_impact(downtime, total),
        data_volume_impact_score: total.saturating_mul(DATA_VOLUME_PER_OPERATION),
        rollback_complexity: rollback_complexity(sql, total),
        operation_counts,
        executed_categories,
        validation_results,
    }
}
