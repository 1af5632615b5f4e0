//! Schema validator: structurally dangerous or non-conforming DDL

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::json;
use std::sync::LazyLock;

use super::{or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{Severity, ValidationCategory, ValidationResult, ValidationStatus};

static FOREIGN_KEY_COLUMNS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\bFOREIGN\s+KEY\s*\(([^)]*)\)")
        .case_insensitive(true)
        .build()
        .expect("foreign key pattern")
});

static CREATED_TABLES: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w."]+)"#)
        .case_insensitive(true)
        .build()
        .expect("create table pattern")
});

static TABLE_NAME_CONVENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("naming pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

#[async_trait]
impl CategoryValidator for SchemaValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::Schema
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let sql = ctx.sql();
        let mut results = rules::evaluate(ValidationCategory::Schema, sql);
        results.extend(check_foreign_key_indexes(sql));
        results.extend(check_table_naming(sql));
        or_passed(results, ValidationCategory::Schema, "Schema validation passed")
    }
}

/// Foreign key columns with no index mentioning them, first-seen order
pub fn unindexed_foreign_key_columns(sql: &str) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();

    for caps in FOREIGN_KEY_COLUMNS.captures_iter(sql) {
        for column in caps[1].split(',') {
            let column = column.trim().trim_matches('"').to_string();
            if column.is_empty() || columns.contains(&column) {
                continue;
            }
            let index_pattern = format!(r"(?is)\bINDEX\b[^;]*\([^)]*\b{}\b", regex::escape(&column));
            let indexed = match Regex::new(&index_pattern) {
                Ok(re) => re.is_match(sql),
                Err(_) => false,
            };
            if !indexed {
                columns.push(column);
            }
        }
    }

    columns
}

fn check_foreign_key_indexes(sql: &str) -> Vec<ValidationResult> {
    unindexed_foreign_key_columns(sql)
        .into_iter()
        .map(|column| {
            ValidationResult::new(
                ValidationCategory::Schema,
                "foreign_key_index_check",
                Severity::Warning,
                ValidationStatus::Warning,
                format!("Foreign key column '{}' has no supporting index", column),
            )
            .with_details(json!({ "column": column }))
            .with_recommendations([format!(
                "CREATE INDEX CONCURRENTLY ON <table> ({}) to avoid sequential scans on joins and cascades",
                column
            )])
        })
        .collect()
}

fn check_table_naming(sql: &str) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    for caps in CREATED_TABLES.captures_iter(sql) {
        let qualified = caps[1].replace('"', "");
        let table = qualified.rsplit('.').next().unwrap_or(&qualified);
        if !TABLE_NAME_CONVENTION.is_match(table) {
            results.push(
                ValidationResult::new(
                    ValidationCategory::Schema,
                    "naming_convention_check",
                    Severity::Warning,
                    ValidationStatus::Warning,
                    format!("Table name '{}' does not follow snake_case convention", table),
                )
                .with_details(json!({ "table": table }))
                .with_recommendations(["Use lowercase snake_case table names (^[a-z][a-z0-9_]*$)"]),
            );
        }
    }

    results
}
