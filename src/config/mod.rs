//! # Gate Configuration
//!
//! Loaded from `migration-gate.yaml` (or the path in `MIGRATION_GATE_CONFIG`).
//! Every field has a default, so the file is optional:
//!
//! ```yaml
//! max_risk_score: 40
//! fail_on_critical: true
//! collaborator_timeout: 3s
//! suppressed_checks:
//!   - permission_management
//! excluded_files:
//!   - "2023*"
//! check_after: "20240101"
//! ```
//!
//! Command-line flags override file values.

mod gates;

pub use gates::GateConfig;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "migration-gate.yaml";
