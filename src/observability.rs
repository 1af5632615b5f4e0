//! # Gate Observability Module
//!
//! Structured events and metrics for migration validation runs.
//!
//! ## Event Flow
//!
//! ```text
//! migration-gate → GATE_EVENT lines → Vector → Loki → Grafana
//!                ↘ Pushgateway → Prometheus → Grafana
//! ```
//!
//! ## Components
//!
//! 1. **Structured Events**: JSON logs prefixed with `GATE_EVENT:` for Vector collection.
//!    They share stdout with a text report and move to stderr when stdout
//!    carries the JSON report.
//! 2. **Prometheus Metrics**: Pushed to Pushgateway per analysed migration
//!
//! ## Pushgateway
//!
//! Set `PUSHGATEWAY_URL` environment variable to enable metrics pushing:
//! ```bash
//! export PUSHGATEWAY_URL=http://pushgateway.monitoring.svc.cluster.local:9091
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{GateVerdict, MigrationAnalysis, Severity};

/// Event prefix for Vector to identify structured events
const EVENT_PREFIX: &str = "GATE_EVENT:";

/// Gate event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum GateEvent {
    /// Migration analysed and allowed through
    MigrationValidated(MigrationEvent),
    /// Migration analysed and blocked
    MigrationBlocked(MigrationEvent),
}

/// Common fields for all events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// One id per CLI invocation, shared by every migration it validates
    pub run_id: String,
    /// Timestamp in RFC3339 format
    pub timestamp: String,
    /// Hostname of the machine running the gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// CI job ID if running in CI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_job_id: Option<String>,
}

impl EventMetadata {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            hostname: std::env::var("HOSTNAME").ok(),
            ci_job_id: std::env::var("GITHUB_RUN_ID")
                .ok()
                .or_else(|| std::env::var("CI_JOB_ID").ok()),
        }
    }
}

/// Severity tallies of one analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl FindingCounts {
    pub fn of(analysis: &MigrationAnalysis) -> Self {
        Self {
            critical: analysis.count(Severity::Critical),
            error: analysis.count(Severity::Error),
            warning: analysis.count(Severity::Warning),
            info: analysis.count(Severity::Info),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub migration_id: String,
    pub path: String,
    pub risk_score: u8,
    pub complexity: String,
    pub total_operations: u32,
    pub requires_downtime: bool,
    pub findings: FindingCounts,
    /// Why the gate blocked; empty when validated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl GateEvent {
    /// Event describing the outcome of one migration
    pub fn for_analysis(
        metadata: EventMetadata,
        path: impl Into<String>,
        analysis: &MigrationAnalysis,
        verdict: &GateVerdict,
    ) -> Self {
        let event = MigrationEvent {
            metadata,
            migration_id: analysis.migration_id.clone(),
            path: path.into(),
            risk_score: analysis.risk_score,
            complexity: analysis.complexity.to_string(),
            total_operations: analysis.total_operations(),
            requires_downtime: analysis.requires_downtime,
            findings: FindingCounts::of(analysis),
            reasons: verdict.reasons.clone(),
        };

        if verdict.passed {
            Self::MigrationValidated(event)
        } else {
            Self::MigrationBlocked(event)
        }
    }
}

/// Render an event as one `GATE_EVENT:`-prefixed line
pub fn format_event(event: &GateEvent) -> Result<String, serde_json::Error> {
    Ok(format!("{}{}", EVENT_PREFIX, serde_json::to_string(event)?))
}

// =============================================================================
// PROMETHEUS METRICS - Pushgateway Integration
// =============================================================================

/// Prometheus metrics for gate runs
///
/// Metrics are pushed to Pushgateway if PUSHGATEWAY_URL is set.
pub mod metrics {
    use super::*;

    /// Get Pushgateway URL from environment
    pub fn pushgateway_url() -> Option<String> {
        std::env::var("PUSHGATEWAY_URL").ok()
    }

    /// Build Prometheus text format metrics for one analysed migration
    pub fn build_gate_metrics(analysis: &MigrationAnalysis, passed: bool) -> String {
        let mut output = String::new();
        let id = &analysis.migration_id;

        output.push_str("# HELP migration_gate_risk_score Aggregate risk score (0-100)\n");
        output.push_str("# TYPE migration_gate_risk_score gauge\n");
        output.push_str(&format!(
            "migration_gate_risk_score{{migration=\"{}\",complexity=\"{}\"}} {}\n",
            id, analysis.complexity, analysis.risk_score
        ));

        output.push_str(
            "# HELP migration_gate_total_operations Structural operations in the migration\n",
        );
        output.push_str("# TYPE migration_gate_total_operations gauge\n");
        output.push_str(&format!(
            "migration_gate_total_operations{{migration=\"{}\"}} {}\n",
            id,
            analysis.total_operations()
        ));

        let counts = FindingCounts::of(analysis);
        output.push_str("# HELP migration_gate_findings Findings by severity\n");
        output.push_str("# TYPE migration_gate_findings gauge\n");
        for (severity, count) in [
            ("critical", counts.critical),
            ("error", counts.error),
            ("warning", counts.warning),
            ("info", counts.info),
        ] {
            output.push_str(&format!(
                "migration_gate_findings{{migration=\"{}\",severity=\"{}\"}} {}\n",
                id, severity, count
            ));
        }

        let status = if passed { "validated" } else { "blocked" };
        output.push_str("# HELP migration_gate_total Total gate decisions\n");
        output.push_str("# TYPE migration_gate_total counter\n");
        output.push_str(&format!(
            "migration_gate_total{{migration=\"{}\",status=\"{}\"}} 1\n",
            id, status
        ));

        output
    }

    /// Push metrics to Pushgateway
    ///
    /// Uses the job/instance grouping for proper metric isolation:
    /// - job: "migration-gate"
    /// - instance: "{migration_id}"
    pub async fn push_metrics(metrics: &str, migration_id: &str) -> Result<(), String> {
        let base_url = match pushgateway_url() {
            Some(url) => url,
            None => {
                tracing::debug!("PUSHGATEWAY_URL not set, skipping metrics push");
                return Ok(());
            }
        };

        // Pushgateway expects: /metrics/job/<job>/instance/<instance>
        let url = format!(
            "{}/metrics/job/{}/instance/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode("migration-gate"),
            urlencoding::encode(migration_id)
        );

        tracing::info!(url = %url, "Pushing metrics to Pushgateway");

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(metrics.to_string())
            .send()
            .await
            .map_err(|e| format!("Failed to push metrics: {}", e))?;

        if response.status().is_success() {
            tracing::info!("Metrics pushed successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(format!("Pushgateway returned {}: {}", status, body))
        }
    }

    /// Push gate metrics for one migration; failures are only logged
    pub async fn push_gate_metrics(analysis: &MigrationAnalysis, passed: bool) {
        let metrics = build_gate_metrics(analysis, passed);
        if let Err(e) = push_metrics(&metrics, &analysis.migration_id).await {
            tracing::warn!("Failed to push gate metrics: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{analyzer, ValidationCategory, ValidationResult, ValidationStatus};

    fn analysis() -> MigrationAnalysis {
        let results = vec![
            ValidationResult::new(
                ValidationCategory::Security,
                "hardcoded_secret",
                Severity::Critical,
                ValidationStatus::Failed,
                "Hardcoded secret detected",
            ),
            ValidationResult::passed(ValidationCategory::Schema, "Schema validation passed"),
        ];
        analyzer::analyze(
            "042_add_api_keys",
            "ALTER TABLE tenants ADD COLUMN api_key text;",
            vec![ValidationCategory::Schema, ValidationCategory::Security],
            results,
        )
    }

    #[test]
    fn test_event_serialization() {
        let analysis = analysis();
        let verdict = analysis.verdict(50, true);
        let event = GateEvent::for_analysis(
            EventMetadata::new(Uuid::new_v4()),
            "db/migrations/042_add_api_keys.sql",
            &analysis,
            &verdict,
        );

        let line = format_event(&event).unwrap();
        assert!(line.starts_with("GATE_EVENT:{"));
        assert!(line.contains("\"event_type\":\"MigrationBlocked\""));
        assert!(line.contains("\"migration_id\":\"042_add_api_keys\""));
        assert!(line.contains("\"critical\":1"));
        assert!(line.contains("critical finding hardcoded_secret"));
    }

    #[test]
    fn test_validated_event_omits_reasons() {
        let analysis = analysis();
        let verdict = analysis.verdict(50, false);
        let event = GateEvent::for_analysis(
            EventMetadata::new(Uuid::new_v4()),
            "042.sql",
            &analysis,
            &verdict,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "MigrationValidated");
        assert!(json.get("reasons").is_none());
        assert_eq!(json["risk_score"], 25);
    }

    #[test]
    fn test_gate_metrics_format() {
        let output = metrics::build_gate_metrics(&analysis(), false);

        assert!(output.contains("migration_gate_risk_score{migration=\"042_add_api_keys\",complexity=\"LOW\"} 25"));
        assert!(output.contains("migration_gate_total_operations{migration=\"042_add_api_keys\"} 1"));
        assert!(output.contains("severity=\"critical\"} 1"));
        assert!(output.contains("severity=\"warning\"} 0"));
        assert!(output.contains("status=\"blocked\"} 1"));
    }
}
