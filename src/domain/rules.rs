//! Pattern Rule Library
//!
//! Declarative detection rules grouped by category. A rule pairs a detector
//! (case-insensitive regex predicates over the migration text) with the
//! severity, status, message and recommendations it reports when it fires.
//! Validators evaluate the table; adding a check means adding a row here.
//!
//! Checks that extract values from the script (unindexed foreign key columns,
//! table naming, SRID consistency) live in their validators instead.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::finding::{Severity, ValidationCategory, ValidationResult, ValidationStatus};

/// Compile a case-insensitive pattern from the rule table
fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid rule pattern {pattern:?}: {e}"))
}

/// Split a script into `;`-terminated statements
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').filter(|s| !s.trim().is_empty())
}

/// Text predicate deciding whether a rule fires
#[derive(Debug)]
pub enum Detector {
    /// Pattern matches anywhere in the script
    Matches(Regex),
    /// Pattern matches within a single statement (use `(?s)` to span lines)
    InStatement(Regex),
    /// Every pattern matches somewhere in the script
    AllOf(Vec<Regex>),
    /// Pattern matches somewhere and `absent` matches nowhere in the script
    Without { pattern: Regex, absent: Regex },
    /// Some statement matches `pattern` but not `absent`
    StatementWithout { pattern: Regex, absent: Regex },
}

impl Detector {
    pub fn fires(&self, sql: &str) -> bool {
        match self {
            Detector::Matches(re) => re.is_match(sql),
            Detector::InStatement(re) => statements(sql).any(|stmt| re.is_match(stmt)),
            Detector::AllOf(patterns) => patterns.iter().all(|re| re.is_match(sql)),
            Detector::Without { pattern, absent } => pattern.is_match(sql) && !absent.is_match(sql),
            Detector::StatementWithout { pattern, absent } => {
                statements(sql).any(|stmt| pattern.is_match(stmt) && !absent.is_match(stmt))
            }
        }
    }
}

/// One row of the rule library
#[derive(Debug)]
pub struct PatternRule {
    pub category: ValidationCategory,
    pub test_name: &'static str,
    pub severity: Severity,
    pub status: ValidationStatus,
    pub detector: Detector,
    pub message: &'static str,
    pub recommendations: &'static [&'static str],
    /// Among rules sharing this test name, only the first that fires reports
    pub first_match_only: bool,
}

impl PatternRule {
    pub fn fires(&self, sql: &str) -> bool {
        self.detector.fires(sql)
    }

    /// The finding this rule reports when it fires
    pub fn to_result(&self) -> ValidationResult {
        ValidationResult::new(
            self.category,
            self.test_name,
            self.severity,
            self.status,
            self.message,
        )
        .with_recommendations(self.recommendations.iter().copied())
    }
}

/// Shorthand for building table rows
struct Row {
    category: ValidationCategory,
    test_name: &'static str,
    severity: Severity,
    status: ValidationStatus,
    message: &'static str,
    recommendations: &'static [&'static str],
}

impl Row {
    fn detect(self, detector: Detector) -> PatternRule {
        PatternRule {
            category: self.category,
            test_name: self.test_name,
            severity: self.severity,
            status: self.status,
            detector,
            message: self.message,
            recommendations: self.recommendations,
            first_match_only: false,
        }
    }
}

fn first_match_only(mut rule: PatternRule) -> PatternRule {
    rule.first_match_only = true;
    rule
}

// Unanchored substring match, so `last_stop_id` counts as spatial and
// `tsvector` as AI/ML.
const SPATIAL_TRIGGER: &str = r"geometry|geography|postgis|st_|gist";
const AI_ML_TRIGGER: &str = r"vector|ml_|ai_|embedding|pgvector";

static SPATIAL_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| ci(SPATIAL_TRIGGER));
static AI_ML_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| ci(AI_ML_TRIGGER));

/// Whether the script uses spatial syntax (gates the Spatial validator)
pub fn mentions_spatial(sql: &str) -> bool {
    SPATIAL_TRIGGER_RE.is_match(sql)
}

/// Whether the script uses vector/ML syntax (gates the AI/ML validator)
pub fn mentions_ai_ml(sql: &str) -> bool {
    AI_ML_TRIGGER_RE.is_match(sql)
}

static RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(build_rules);

/// The full rule library, grouped by category in orchestration order
pub fn rules() -> &'static [PatternRule] {
    &RULES
}

/// Rules belonging to one category, in table order
pub fn rules_for(category: ValidationCategory) -> impl Iterator<Item = &'static PatternRule> {
    rules().iter().filter(move |rule| rule.category == category)
}

/// Look up a rule by test name
pub fn find(test_name: &str) -> Option<&'static PatternRule> {
    rules().iter().find(|rule| rule.test_name == test_name)
}

/// Evaluate every table rule of a category against the script
///
/// Rules marked `first_match_only` short-circuit: once one of them fires,
/// later rules with the same test name are not reported.
pub fn evaluate(category: ValidationCategory, sql: &str) -> Vec<ValidationResult> {
    let mut results: Vec<ValidationResult> = Vec::new();

    for rule in rules_for(category) {
        if rule.first_match_only && results.iter().any(|r| r.test_name == rule.test_name) {
            continue;
        }
        if rule.fires(sql) {
            results.push(rule.to_result());
        }
    }

    results
}

fn build_rules() -> Vec<PatternRule> {
    use Severity::*;
    use ValidationCategory as C;
    use ValidationStatus as S;

    vec![
        // -- Schema ---------------------------------------------------------
        Row {
            category: C::Schema,
            test_name: "dangerous_operation_check",
            severity: Error,
            status: S::Failed,
            message: "DROP TABLE without IF EXISTS is a dangerous operation",
            recommendations: &[
                "Use DROP TABLE IF EXISTS",
                "Take a backup of the table before dropping it",
                "Deprecate the table in an earlier release before removing it",
            ],
        }
        .detect(Detector::StatementWithout {
            pattern: ci(r"\bDROP\s+TABLE\b"),
            absent: ci(r"\bDROP\s+TABLE\s+IF\s+EXISTS\b"),
        }),
        Row {
            category: C::Schema,
            test_name: "drop_column_check",
            severity: Error,
            status: S::Failed,
            message: "DROP COLUMN detected: potential data loss",
            recommendations: &[
                "Use the expand-contract pattern: stop reading the column, then drop it in a later migration",
                "Back up the column data before dropping it",
            ],
        }
        .detect(Detector::Matches(ci(r"\bDROP\s+COLUMN\b"))),
        Row {
            category: C::Schema,
            test_name: "not_null_column_check",
            severity: Error,
            status: S::Failed,
            message: "NOT NULL applied via ALTER COLUMN requires a backfill strategy",
            recommendations: &[
                "Add the column as nullable first",
                "Backfill existing rows in batches",
                "Apply SET NOT NULL in a follow-up migration",
            ],
        }
        .detect(Detector::InStatement(ci(r"(?s)\bALTER\s+COLUMN\b.*\bNOT\s+NULL\b"))),
        Row {
            category: C::Schema,
            test_name: "truncate_check",
            severity: Error,
            status: S::Failed,
            message: "TRUNCATE TABLE causes irreversible data loss",
            recommendations: &[
                "Archive the data before truncating",
                "Use batched DELETE with a WHERE clause if only part of the data must go",
            ],
        }
        .detect(Detector::Matches(ci(r"\bTRUNCATE\s+TABLE\b"))),
        Row {
            category: C::Schema,
            test_name: "mass_delete_check",
            severity: Error,
            status: S::Failed,
            message: "Mass DELETE with WHERE 1=1 removes every row",
            recommendations: &[
                "Use a selective WHERE clause",
                "Delete in bounded batches",
            ],
        }
        .detect(Detector::Matches(ci(r#"\bDELETE\s+FROM\s+[\w."]+\s+WHERE\s+1\s*=\s*1\b"#))),
        Row {
            category: C::Schema,
            test_name: "primary_key_check",
            severity: Error,
            status: S::Failed,
            message: "CREATE TABLE without a PRIMARY KEY",
            recommendations: &["Declare a PRIMARY KEY on every new table"],
        }
        .detect(Detector::Without {
            pattern: ci(r"\bCREATE\s+TABLE\b"),
            absent: ci(r"\bPRIMARY\s+KEY\b"),
        }),
        // -- Performance ----------------------------------------------------
        Row {
            category: C::Performance,
            test_name: "add_not_null_column_lock",
            severity: Error,
            status: S::Failed,
            message: "ADD COLUMN ... NOT NULL rewrites the table under an exclusive lock (high impact)",
            recommendations: &[
                "Add the column as nullable with a default",
                "Backfill in batches, then SET NOT NULL",
            ],
        }
        .detect(Detector::InStatement(ci(
            r"(?s)\bALTER\s+TABLE\b.*\bADD\s+COLUMN\b.*\bNOT\s+NULL\b",
        ))),
        Row {
            category: C::Performance,
            test_name: "index_without_concurrently",
            severity: Warning,
            status: S::Warning,
            message: "CREATE INDEX without CONCURRENTLY blocks writes while building (medium impact)",
            recommendations: &[
                "Use CREATE INDEX CONCURRENTLY",
                "Run the migration outside a transaction block",
            ],
        }
        .detect(Detector::StatementWithout {
            pattern: ci(r"\bCREATE\s+(UNIQUE\s+)?INDEX\b"),
            absent: ci(r"\bCONCURRENTLY\b"),
        }),
        Row {
            category: C::Performance,
            test_name: "add_constraint_lock",
            severity: Warning,
            status: S::Warning,
            message: "ALTER TABLE ... ADD CONSTRAINT validates existing rows under lock",
            recommendations: &[
                "Add the constraint with NOT VALID",
                "Run VALIDATE CONSTRAINT in a separate migration",
            ],
        }
        .detect(Detector::InStatement(ci(r"(?s)\bALTER\s+TABLE\b.*\bADD\s+CONSTRAINT\b"))),
        Row {
            category: C::Performance,
            test_name: "vacuum_full_lock",
            severity: Error,
            status: S::Failed,
            message: "VACUUM FULL takes an exclusive lock for its whole duration",
            recommendations: &[
                "Use plain VACUUM or pg_repack",
                "Schedule a maintenance window if VACUUM FULL is unavoidable",
            ],
        }
        .detect(Detector::Matches(ci(r"\bVACUUM\s+FULL\b"))),
        Row {
            category: C::Performance,
            test_name: "mass_operation_check",
            severity: Error,
            status: S::Failed,
            message: "UPDATE/DELETE without any WHERE clause affects every row",
            recommendations: &[
                "Add a WHERE clause",
                "Process rows in bounded batches",
            ],
        }
        .detect(Detector::Without {
            pattern: ci(r#"\bUPDATE\s+[\w."]+\s+SET\b|\bDELETE\s+FROM\b"#),
            absent: ci(r"\bWHERE\b"),
        }),
        // -- Data integrity -------------------------------------------------
        Row {
            category: C::DataIntegrity,
            test_name: "foreign_key_constraints",
            severity: Info,
            status: S::Passed,
            message: "Foreign key constraints enforce referential integrity",
            recommendations: &[],
        }
        .detect(Detector::Matches(ci(r"\bFOREIGN\s+KEY\b"))),
        Row {
            category: C::DataIntegrity,
            test_name: "check_constraints",
            severity: Info,
            status: S::Passed,
            message: "CHECK constraints enforce domain integrity",
            recommendations: &[],
        }
        .detect(Detector::Matches(ci(r"\bCHECK\s*\("))),
        first_match_only(
            Row {
                category: C::DataIntegrity,
                test_name: "data_loss_risk",
                severity: Warning,
                status: S::Warning,
                message: "DROP COLUMN may cause data loss, verify backup",
                recommendations: DATA_LOSS_RECOMMENDATIONS,
            }
            .detect(Detector::Matches(ci(r"\bDROP\s+COLUMN\b"))),
        ),
        first_match_only(
            Row {
                category: C::DataIntegrity,
                test_name: "data_loss_risk",
                severity: Warning,
                status: S::Warning,
                message: "TRUNCATE TABLE may cause data loss, verify backup",
                recommendations: DATA_LOSS_RECOMMENDATIONS,
            }
            .detect(Detector::Matches(ci(r"\bTRUNCATE\s+TABLE\b"))),
        ),
        first_match_only(
            Row {
                category: C::DataIntegrity,
                test_name: "data_loss_risk",
                severity: Warning,
                status: S::Warning,
                message: "DELETE FROM may cause data loss, verify backup",
                recommendations: DATA_LOSS_RECOMMENDATIONS,
            }
            .detect(Detector::Matches(ci(r"\bDELETE\s+FROM\b"))),
        ),
        first_match_only(
            Row {
                category: C::DataIntegrity,
                test_name: "data_loss_risk",
                severity: Warning,
                status: S::Warning,
                message: "ALTER COLUMN ... TYPE may cause data loss, verify backup",
                recommendations: DATA_LOSS_RECOMMENDATIONS,
            }
            .detect(Detector::InStatement(ci(r"(?s)\bALTER\s+COLUMN\b.*\bTYPE\b"))),
        ),
        // -- Security -------------------------------------------------------
        Row {
            category: C::Security,
            test_name: "dynamic_sql_injection",
            severity: Error,
            status: S::Failed,
            message: "EXECUTE with string concatenation: SQL injection risk in dynamic SQL",
            recommendations: &[
                "Use format() with %I / %L placeholders",
                "Pass values through EXECUTE ... USING",
            ],
        }
        .detect(Detector::AllOf(vec![ci(r"\bEXECUTE\b"), ci(r"\|\|")])),
        Row {
            category: C::Security,
            test_name: "hardcoded_secret",
            severity: Critical,
            status: S::Failed,
            message: "Hardcoded secret detected",
            recommendations: &[
                "Remove the literal and rotate the credential",
                "Inject secrets from the secret store at deploy time",
            ],
        }
        .detect(Detector::Matches(ci(
            r#"\b(password|secret|api_key)\s*=\s*('[^']+'|"[^"]+")"#,
        ))),
        Row {
            category: C::Security,
            test_name: "permission_management",
            severity: Info,
            status: S::Warning,
            message: "Permission management detected, verify RBAC",
            recommendations: &["Review granted privileges against the least-privilege policy"],
        }
        .detect(Detector::Matches(ci(r"\b(GRANT|REVOKE)\b"))),
        // -- Spatial --------------------------------------------------------
        Row {
            category: C::Spatial,
            test_name: "postgis_extension_check",
            severity: Warning,
            status: S::Warning,
            message: "Spatial syntax used without CREATE EXTENSION IF NOT EXISTS postgis",
            recommendations: &["Add CREATE EXTENSION IF NOT EXISTS postgis before spatial DDL"],
        }
        .detect(Detector::Without {
            pattern: ci(SPATIAL_TRIGGER),
            absent: ci(r#"\bCREATE\s+EXTENSION\s+IF\s+NOT\s+EXISTS\s+"?postgis\b"#),
        }),
        Row {
            category: C::Spatial,
            test_name: "spatial_index_check",
            severity: Warning,
            status: S::Warning,
            message: "geometry column declared without a GIST index",
            recommendations: &["CREATE INDEX CONCURRENTLY ... USING GIST (geom_column)"],
        }
        .detect(Detector::Without {
            pattern: ci(r"\bgeometry\b"),
            absent: ci(r"\bgist\b"),
        }),
        // -- AI/ML ----------------------------------------------------------
        Row {
            category: C::AiMl,
            test_name: "vector_extension_check",
            severity: Warning,
            status: S::Warning,
            message: "vector type used without a CREATE EXTENSION statement",
            recommendations: &["Add CREATE EXTENSION IF NOT EXISTS vector"],
        }
        .detect(Detector::Without {
            pattern: ci(r"\bvector\b"),
            absent: ci(r"\bCREATE\s+EXTENSION\b"),
        }),
        Row {
            category: C::AiMl,
            test_name: "vector_index_check",
            severity: Warning,
            status: S::Warning,
            message: "vector column without an approximate nearest-neighbour index",
            recommendations: &[
                "CREATE INDEX ... USING ivfflat (embedding vector_cosine_ops)",
                "Consider hnsw for higher recall",
            ],
        }
        .detect(Detector::Without {
            pattern: ci(r"\bvector\b"),
            absent: ci(r"\b(ivfflat|hnsw)\b"),
        }),
    ]
}

const DATA_LOSS_RECOMMENDATIONS: &[&str] = &[
    "Verify a restorable backup exists before running",
    "Keep a copy of affected data until the release is verified",
];
