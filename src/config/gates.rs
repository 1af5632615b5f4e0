use anyhow::{bail, Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::ValidationSettings;

/// Upper bound for `collaborator_timeout`
const MAX_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(300);

/// Gate configuration (`migration-gate.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Block migrations whose risk score is above this (default: 50)
    #[serde(default = "default_max_risk_score")]
    pub max_risk_score: u8,

    /// Block migrations with any Critical finding (default: true)
    #[serde(default = "default_true")]
    pub fail_on_critical: bool,

    /// Warn when connection utilization is above this percentage (default: 80)
    #[serde(default = "default_pool_utilization_warn_percent")]
    pub pool_utilization_warn_percent: u32,

    /// First engine major version supporting generated columns (default: 12)
    #[serde(default = "default_min_generated_columns_version")]
    pub min_generated_columns_version: u32,

    /// Directory name holding migrations
    #[serde(default = "default_migrations_segment")]
    pub migrations_segment: String,

    /// Directory name holding rollback scripts
    #[serde(default = "default_rollbacks_segment")]
    pub rollbacks_segment: String,

    /// Timeout for each database or filesystem lookup (e.g. "5s", "750ms")
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout: String,

    /// Lines starting with any of these begin the down section
    #[serde(default = "default_down_markers")]
    pub down_markers: Vec<String>,

    /// Test names to allow-list; matching findings are reported as Skipped
    #[serde(default)]
    pub suppressed_checks: Vec<String>,

    /// Migration files to skip in directory runs
    /// Supports glob patterns (e.g., "2023*") or exact filenames
    #[serde(default)]
    pub excluded_files: Vec<String>,

    /// Minimum migration filename prefix to check (e.g., "20240101")
    /// Files whose numeric prefix sorts before this are skipped
    #[serde(default)]
    pub check_after: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_risk_score: default_max_risk_score(),
            fail_on_critical: true,
            pool_utilization_warn_percent: default_pool_utilization_warn_percent(),
            min_generated_columns_version: default_min_generated_columns_version(),
            migrations_segment: default_migrations_segment(),
            rollbacks_segment: default_rollbacks_segment(),
            collaborator_timeout: default_collaborator_timeout(),
            down_markers: default_down_markers(),
            suppressed_checks: Vec::new(),
            excluded_files: Vec::new(),
            check_after: None,
        }
    }
}

fn default_max_risk_score() -> u8 {
    50
}

fn default_true() -> bool {
    true
}

fn default_pool_utilization_warn_percent() -> u32 {
    80
}

fn default_min_generated_columns_version() -> u32 {
    12
}

fn default_migrations_segment() -> String {
    "migrations".to_string()
}

fn default_rollbacks_segment() -> String {
    "rollbacks".to_string()
}

fn default_collaborator_timeout() -> String {
    "5s".to_string()
}

fn default_down_markers() -> Vec<String> {
    vec![
        "-- migrate:down".to_string(),
        "-- +migrate Down".to_string(),
        "-- +goose Down".to_string(),
    ]
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

impl GateConfig {
    /// Load from a YAML file.
    ///
    /// With `required = false` a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                bail!(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid gate config {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_risk_score > 100 {
            bail!(invalid("max_risk_score", self.max_risk_score));
        }

        if !(1..=100).contains(&self.pool_utilization_warn_percent) {
            bail!(invalid(
                "pool_utilization_warn_percent",
                self.pool_utilization_warn_percent
            ));
        }

        for (field, segment) in [
            ("migrations_segment", &self.migrations_segment),
            ("rollbacks_segment", &self.rollbacks_segment),
        ] {
            if segment.trim().is_empty() || segment.contains(['/', '\\']) {
                bail!(invalid(field, segment));
            }
        }

        if self.migrations_segment == self.rollbacks_segment {
            bail!(
                "migrations_segment and rollbacks_segment must differ (both '{}')",
                self.migrations_segment
            );
        }

        self.timeout()?;

        for (idx, marker) in self.down_markers.iter().enumerate() {
            if marker.trim().is_empty() {
                bail!("down_markers[{}] cannot be empty or whitespace-only", idx);
            }
        }

        for pattern in &self.excluded_files {
            if pattern.trim().is_empty() {
                bail!("excluded_files cannot contain empty patterns");
            }
        }

        Ok(())
    }

    /// Parsed `collaborator_timeout`
    pub fn timeout(&self) -> Result<Duration> {
        let timeout = humantime::parse_duration(&self.collaborator_timeout)
            .map_err(|_| invalid("collaborator_timeout", &self.collaborator_timeout))?;

        if timeout.is_zero() || timeout > MAX_COLLABORATOR_TIMEOUT {
            bail!(invalid("collaborator_timeout", &self.collaborator_timeout));
        }

        Ok(timeout)
    }

    /// Settings handed to the validators
    pub fn validation_settings(&self) -> Result<ValidationSettings> {
        Ok(ValidationSettings {
            pool_utilization_warn_percent: self.pool_utilization_warn_percent,
            min_generated_columns_version: self.min_generated_columns_version,
            migrations_segment: self.migrations_segment.clone(),
            rollbacks_segment: self.rollbacks_segment.clone(),
            collaborator_timeout: self.timeout()?,
            suppressed_checks: self.suppressed_checks.clone(),
        })
    }

    /// Whether a directory run should skip this file
    pub fn should_exclude_file(&self, file_path: &Path) -> bool {
        let filename = file_path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        // Check check_after threshold
        if let Some(ref threshold) = self.check_after {
            // Numeric prefix, e.g. "20240101" from "20240101_add_bins.sql"
            let file_prefix: String = filename
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !file_prefix.is_empty() && file_prefix < *threshold {
                return true;
            }
        }

        self.excluded_files.iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|glob_pattern| glob_pattern.matches(filename))
                .unwrap_or(false)
                || filename == pattern
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.max_risk_score, 50);
        assert!(config.fail_on_critical);
        assert_eq!(config.pool_utilization_warn_percent, 80);
        assert_eq!(config.down_markers.len(), 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = GateConfig::from_yaml("{}").unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let config = GateConfig::from_yaml(
            "max_risk_score: 30\n\
             collaborator_timeout: 750ms\n\
             suppressed_checks:\n  - permission_management\n",
        )
        .unwrap();
        assert_eq!(config.max_risk_score, 30);
        assert!(config.fail_on_critical);

        let settings = config.validation_settings().unwrap();
        assert_eq!(settings.collaborator_timeout, Duration::from_millis(750));
        assert_eq!(settings.suppressed_checks, vec!["permission_management"]);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(GateConfig::from_yaml("max_risk_score: 101").is_err());
        assert!(GateConfig::from_yaml("pool_utilization_warn_percent: 0").is_err());
        assert!(GateConfig::from_yaml("collaborator_timeout: 0s").is_err());
        assert!(GateConfig::from_yaml("collaborator_timeout: 10m").is_err());
        assert!(GateConfig::from_yaml("collaborator_timeout: soon").is_err());
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(GateConfig::from_yaml("rollbacks_segment: migrations").is_err());
        assert!(GateConfig::from_yaml("migrations_segment: ''").is_err());
        assert!(GateConfig::from_yaml("migrations_segment: db/migrations").is_err());
    }

    #[test]
    fn test_parse_error_is_typed() {
        let err = GateConfig::from_yaml("max_risk_score: [1, 2]").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let missing = PathBuf::from("/nonexistent/migration-gate.yaml");
        assert_eq!(GateConfig::load(&missing, false).unwrap(), GateConfig::default());

        let err = GateConfig::load(&missing, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fail_on_critical: false\ncheck_after: \"20240101\"").unwrap();

        let config = GateConfig::load(file.path(), true).unwrap();
        assert!(!config.fail_on_critical);
        assert_eq!(config.check_after.as_deref(), Some("20240101"));
    }

    #[test]
    fn test_migration_exclusion() {
        let config = GateConfig {
            excluded_files: vec!["2023*".to_string(), "legacy_seed.sql".to_string()],
            check_after: Some("20240101".to_string()),
            ..Default::default()
        };

        assert!(config.should_exclude_file(Path::new("db/migrations/20230505_init.sql")));
        assert!(config.should_exclude_file(Path::new("db/migrations/legacy_seed.sql")));
        assert!(config.should_exclude_file(Path::new("db/migrations/20231231_x.sql")));
        assert!(!config.should_exclude_file(Path::new("db/migrations/20240102_bins.sql")));
        assert!(!config.should_exclude_file(Path::new("db/migrations/add_bins.sql")));
    }
}
