//! Validation finding types
//!
//! A `ValidationResult` is one observation emitted by a category validator.
//! Findings are values, never errors: even a failed collaborator lookup is
//! reported through this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis categories, one per validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationCategory {
    Schema,
    Performance,
    DataIntegrity,
    Security,
    Spatial,
    AiMl,
    Rollback,
    Compatibility,
}

impl ValidationCategory {
    /// All categories in orchestration order
    pub const ALL: [ValidationCategory; 8] = [
        Self::Schema,
        Self::Performance,
        Self::DataIntegrity,
        Self::Security,
        Self::Spatial,
        Self::AiMl,
        Self::Rollback,
        Self::Compatibility,
    ];

    /// Stable snake_case key, used for result names and CLI filters
    pub fn key(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Performance => "performance",
            Self::DataIntegrity => "data_integrity",
            Self::Security => "security",
            Self::Spatial => "spatial",
            Self::AiMl => "ai_ml",
            Self::Rollback => "rollback",
            Self::Compatibility => "compatibility",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "schema" => Some(Self::Schema),
            "performance" | "perf" => Some(Self::Performance),
            "data_integrity" | "dataintegrity" | "integrity" => Some(Self::DataIntegrity),
            "security" => Some(Self::Security),
            "spatial" => Some(Self::Spatial),
            "ai_ml" | "aiml" | "ml" => Some(Self::AiMl),
            "rollback" => Some(Self::Rollback),
            "compatibility" | "compat" => Some(Self::Compatibility),
            _ => None,
        }
    }

    /// Name of the result emitted when a collaborator lookup fails
    pub fn error_test_name(&self) -> String {
        format!("{}_validation_error", self.key())
    }

    /// Name of the summary result emitted when nothing fires
    pub fn passed_test_name(&self) -> String {
        format!("{}_validation", self.key())
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Schema => "Schema",
            Self::Performance => "Performance",
            Self::DataIntegrity => "Data Integrity",
            Self::Security => "Security",
            Self::Spatial => "Spatial",
            Self::AiMl => "AI/ML",
            Self::Rollback => "Rollback",
            Self::Compatibility => "Compatibility",
        };
        write!(f, "{}", name)
    }
}

/// Finding severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Risk points contributed by one finding of this severity
    pub fn risk_weight(&self) -> u32 {
        match self {
            Self::Info => 0,
            Self::Warning => 5,
            Self::Error => 15,
            Self::Critical => 25,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStatus {
    Passed,
    Failed,
    Warning,
    Skipped,
}

/// One reported observation from a category validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub category: ValidationCategory,
    /// Stable identifier, used for suppression and assertions
    pub test_name: String,
    pub severity: Severity,
    pub status: ValidationStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ValidationResult {
    /// Create a result with empty details and recommendations.
    ///
    /// Observability metadata is zeroed until the orchestrator stamps it.
    pub fn new(
        category: ValidationCategory,
        test_name: impl Into<String>,
        severity: Severity,
        status: ValidationStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            test_name: test_name.into(),
            severity,
            status,
            message: message.into(),
            details: None,
            recommendations: Vec::new(),
            execution_time_ms: 0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// The single Passed/Info record a category emits when nothing fires
    pub fn passed(category: ValidationCategory, message: impl Into<String>) -> Self {
        Self::new(
            category,
            category.passed_test_name(),
            Severity::Info,
            ValidationStatus::Passed,
            message,
        )
    }

    /// A collaborator failure converted into a finding
    pub fn validator_error(category: ValidationCategory, message: impl Into<String>) -> Self {
        Self::new(
            category,
            category.error_test_name(),
            Severity::Critical,
            ValidationStatus::Failed,
            message,
        )
    }

    /// Builder: attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Builder: attach remediation suggestions
    pub fn with_recommendations<I, S>(mut self, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommendations = recommendations.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: record when and how long the producing category ran
    pub fn stamped(mut self, timestamp: DateTime<Utc>, execution_time_ms: u64) -> Self {
        self.timestamp = timestamp;
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Builder: allow-list this finding so it no longer counts toward risk
    pub fn suppressed(mut self) -> Self {
        self.status = ValidationStatus::Skipped;
        self.severity = Severity::Info;
        self.message = format!("[suppressed] {}", self.message);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
