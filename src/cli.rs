//! CLI definitions for migration-gate
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "migration-gate",
    version,
    about = "Production-safety gate for database migrations",
    long_about = "Statically analyses SQL migrations for risky operations before they reach a live database.\nFails the run when the aggregate risk score or a critical finding crosses the configured gate."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Coloured per-migration report
    Text,
    /// Pretty-printed JSON array of analyses
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a migration file, or every *.sql file in a directory
    Validate {
        /// Migration file or directory
        path: PathBuf,

        /// Migration id (single file only; defaults to the file stem)
        #[arg(long)]
        id: Option<String>,

        /// Gate config file (default: ./migration-gate.yaml if present)
        #[arg(long, env = "MIGRATION_GATE_CONFIG")]
        config: Option<PathBuf>,

        /// Read pool utilization and server version from this database
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,

        /// Engine version reported when no database is given
        #[arg(long, default_value = "16")]
        engine_version: String,

        /// Pool utilization percent reported when no database is given
        #[arg(long, default_value_t = 0)]
        pool_utilization: u32,

        /// Override the config's max_risk_score
        #[arg(long, env = "MIGRATION_GATE_MAX_RISK", value_parser = clap::value_parser!(u8).range(0..=100))]
        max_risk: Option<u8>,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print a GATE_EVENT: line per migration for log collectors
        #[arg(long)]
        emit_events: bool,
    },

    /// List the pattern rule library
    Rules {
        /// Only rules of this category (e.g. schema, performance, ai_ml)
        #[arg(long)]
        category: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate_defaults() {
        let cli = Cli::try_parse_from(["migration-gate", "validate", "db/migrations"]).unwrap();
        match cli.command {
            Commands::Validate {
                path,
                engine_version,
                pool_utilization,
                format,
                emit_events,
                ..
            } => {
                assert_eq!(path, PathBuf::from("db/migrations"));
                assert_eq!(engine_version, "16");
                assert_eq!(pool_utilization, 0);
                assert_eq!(format, OutputFormat::Text);
                assert!(!emit_events);
            }
            Commands::Rules { .. } => panic!("expected validate"),
        }
    }

    #[test]
    fn test_max_risk_range() {
        assert!(Cli::try_parse_from([
            "migration-gate",
            "validate",
            "001.sql",
            "--max-risk",
            "101"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_rules_with_category() {
        let cli = Cli::try_parse_from(["migration-gate", "rules", "--category", "security"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Rules { category: Some(ref c) } if c == "security"
        ));
    }
}
