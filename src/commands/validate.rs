//! Validate command
//!
//! Runs the validation engine over one migration file or every `*.sql` file
//! in a directory, renders the reports and fails when the gate blocks.
//!
//! ## Configuration
//!
//! Read from `migration-gate.yaml` (see [`crate::config::GateConfig`]);
//! `--max-risk` overrides `max_risk_score`. Directory runs honour
//! `excluded_files` and `check_after`.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::config::{GateConfig, DEFAULT_CONFIG_FILE};
use crate::domain::{GateVerdict, MigrationAnalysis, MigrationSource};
use crate::error::GateError;
use crate::infrastructure::{
    DatabaseMetadata, LocalFileLookup, PostgresMetadata, StaticMetadata,
};
use crate::observability::{self, metrics, EventMetadata, GateEvent};
use crate::services::ValidationService;
use crate::ui::{self, Console};

/// Arguments of `migration-gate validate`
#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub path: PathBuf,
    pub id: Option<String>,
    pub config: Option<PathBuf>,
    pub database_url: Option<String>,
    pub engine_version: String,
    pub pool_utilization: u32,
    pub max_risk: Option<u8>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub emit_events: bool,
}

/// Analysis plus its gate decision
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub analysis: MigrationAnalysis,
    pub verdict: GateVerdict,
    pub path: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    let json_on_stdout = args.output.is_none() && args.format == OutputFormat::Json;
    let mut console = Console::new(io::stdout(), json_on_stdout);
    run(args, &mut console).await
}

/// Run the gate, writing stdout-bound output through `console`
pub async fn run<W: Write>(args: ValidateArgs, console: &mut Console<W>) -> Result<()> {
    let config = match &args.config {
        Some(path) => GateConfig::load(path, true)?,
        None => GateConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
    };
    let max_risk = args.max_risk.unwrap_or(config.max_risk_score);
    let settings = config.validation_settings()?;

    let metadata: Arc<dyn DatabaseMetadata> = match &args.database_url {
        Some(url) => Arc::new(PostgresMetadata::connect_lazy(
            url,
            settings.collaborator_timeout,
        )?),
        None => {
            debug!(
                "No database URL, using static metadata (version {}, utilization {}%)",
                args.engine_version, args.pool_utilization
            );
            Arc::new(StaticMetadata::new(
                args.engine_version.clone(),
                args.pool_utilization,
            ))
        }
    };

    let sources = load_sources(&args.path, args.id.clone(), &config).await?;
    if sources.is_empty() {
        console.warning(&format!(
            "No migration files to check in {}",
            args.path.display()
        ))?;
        return Ok(());
    }

    let service = Arc::new(ValidationService::new(
        metadata,
        Arc::new(LocalFileLookup),
        settings,
    ));
    let analyses = validate_all(service, sources).await?;

    let run_id = Uuid::new_v4();
    info!("Gate run {} over {} migration(s)", run_id, analyses.len());

    let mut outcomes = Vec::with_capacity(analyses.len());
    for (path, analysis) in analyses {
        let verdict = analysis.verdict(max_risk, config.fail_on_critical);

        if args.emit_events {
            let event = GateEvent::for_analysis(
                EventMetadata::new(run_id),
                path.display().to_string(),
                &analysis,
                &verdict,
            );
            match observability::format_event(&event) {
                Ok(line) => console.line(&line)?,
                Err(e) => error!("Failed to serialize event: {}", e),
            }
        }
        metrics::push_gate_metrics(&analysis, verdict.passed).await;

        outcomes.push(GateOutcome {
            analysis,
            verdict,
            path,
        });
    }

    let report = render(&outcomes, args.format)?;
    match &args.output {
        Some(output) => {
            fs::write(output, &report)
                .await
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            console.info(&format!("Report written to {}", output.display()))?;
        }
        None => console.report(&report)?,
    }

    let blocked = outcomes.iter().filter(|o| !o.verdict.passed).count();
    if blocked > 0 {
        ui::print_error(&format!(
            "{} of {} migration(s) blocked (max risk {}, fail on critical: {})",
            blocked,
            outcomes.len(),
            max_risk,
            config.fail_on_critical
        ));
        return Err(GateError::Blocked {
            blocked,
            total: outcomes.len(),
        }
        .into());
    }

    console.success(&format!("{} migration(s) passed the gate", outcomes.len()))?;
    Ok(())
}

/// Read the migration(s) at `path`
pub async fn load_sources(
    path: &Path,
    id: Option<String>,
    config: &GateConfig,
) -> Result<Vec<MigrationSource>> {
    let metadata = fs::metadata(path)
        .await
        .with_context(|| format!("Migration path not found: {}", path.display()))?;

    let files = if metadata.is_dir() {
        if id.is_some() {
            bail!("--id can only be used with a single migration file");
        }
        find_sql_files(path, config).await?
    } else {
        vec![path.to_path_buf()]
    };

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        let raw = fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read: {}", file.display()))?;
        sources.push(MigrationSource::from_file_content(
            &file,
            &raw,
            id.clone(),
            &config.down_markers,
        ));
    }
    Ok(sources)
}

/// Find all SQL files in a directory, filtering by config
pub async fn find_sql_files(dir: &Path, config: &GateConfig) -> Result<Vec<PathBuf>> {
    let mut sql_files = Vec::new();
    let mut excluded = 0usize;

    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read migrations directory: {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            if config.should_exclude_file(&path) {
                excluded += 1;
            } else {
                sql_files.push(path);
            }
        }
    }

    // Sort by filename for consistent ordering
    sql_files.sort();

    if excluded > 0 {
        info!(
            "Found {} migration files ({} excluded by config)",
            sql_files.len(),
            excluded
        );
    } else {
        debug!("Found {} migration files", sql_files.len());
    }

    Ok(sql_files)
}

/// Validate migrations concurrently, returning results in input order
pub async fn validate_all(
    service: Arc<ValidationService>,
    sources: Vec<MigrationSource>,
) -> Result<Vec<(PathBuf, MigrationAnalysis)>> {
    let mut join_set = JoinSet::new();

    for (index, source) in sources.into_iter().enumerate() {
        let service = service.clone();
        join_set.spawn(async move {
            let analysis = service.validate(&source).await;
            (index, source.path, analysis)
        });
    }

    let mut analyses = Vec::with_capacity(join_set.len());
    while let Some(task_result) = join_set.join_next().await {
        let (index, path, analysis) = task_result.context("Validation task failed")?;
        analyses.push((index, path, analysis));
    }

    analyses.sort_by_key(|(index, _, _)| *index);
    Ok(analyses
        .into_iter()
        .map(|(_, path, analysis)| (path, analysis))
        .collect())
}

/// Render outcomes in the requested format
pub fn render(outcomes: &[GateOutcome], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let analyses: Vec<&MigrationAnalysis> = outcomes.iter().map(|o| &o.analysis).collect();
            let mut json = serde_json::to_string_pretty(&analyses)
                .context("Failed to serialize analyses")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => {
            let mut text = String::new();
            for outcome in outcomes {
                text.push_str(&format!(
                    "{}\n",
                    outcome.path.display().to_string().dimmed()
                ));
                text.push_str(&ui::render_analysis(&outcome.analysis, &outcome.verdict));
                text.push('\n');
            }
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ValidationSettings;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, sql: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, sql).unwrap();
        path
    }

    fn offline_service() -> Arc<ValidationService> {
        Arc::new(ValidationService::new(
            Arc::new(StaticMetadata::new("16.1", 0)),
            Arc::new(LocalFileLookup),
            ValidationSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_find_sql_files_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "20240301_b.sql", "SELECT 1;");
        write(tmp.path(), "20240201_a.sql", "SELECT 1;");
        write(tmp.path(), "20230101_old.sql", "SELECT 1;");
        write(tmp.path(), "notes.md", "# not sql");

        let config = GateConfig {
            check_after: Some("20240101".to_string()),
            ..Default::default()
        };
        let files = find_sql_files(tmp.path(), &config).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["20240201_a.sql", "20240301_b.sql"]);
    }

    #[tokio::test]
    async fn test_load_sources_cuts_down_section() {
        let tmp = TempDir::new().unwrap();
        let file = write(
            tmp.path(),
            "003_bins.sql",
            "-- migrate:up\nCREATE TABLE bins (id int PRIMARY KEY);\n-- migrate:down\nDROP TABLE bins;\n",
        );

        let sources = load_sources(&file, None, &GateConfig::default()).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].migration_id, "003_bins");
        assert!(!sources[0].content.contains("DROP TABLE"));
    }

    #[tokio::test]
    async fn test_load_sources_rejects_id_for_directory() {
        let tmp = TempDir::new().unwrap();
        let result = load_sources(tmp.path(), Some("x".to_string()), &GateConfig::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_validate_all_preserves_order_and_checks_rollbacks() {
        let tmp = TempDir::new().unwrap();
        let migrations = tmp.path().join("migrations");
        let rollbacks = tmp.path().join("rollbacks");
        std::fs::create_dir_all(&migrations).unwrap();
        std::fs::create_dir_all(&rollbacks).unwrap();
        write(&migrations, "001_init.sql", "CREATE TABLE users (id uuid PRIMARY KEY);");
        write(&migrations, "002_drop.sql", "DROP TABLE legacy;");
        write(&rollbacks, "001_init.sql", "DROP TABLE users;");

        let sources = load_sources(&migrations, None, &GateConfig::default())
            .await
            .unwrap();
        let analyses = validate_all(offline_service(), sources).await.unwrap();

        let ids: Vec<_> = analyses.iter().map(|(_, a)| a.migration_id.as_str()).collect();
        assert_eq!(ids, vec!["001_init", "002_drop"]);

        let (_, first) = &analyses[0];
        assert_eq!(first.risk_score, 0);
        let (_, second) = &analyses[1];
        assert!(second
            .validation_results
            .iter()
            .any(|r| r.test_name == "rollback_script_check"
                && r.message.contains("create a corresponding rollback migration")));
        assert!(second.risk_score > 0);
    }

    #[tokio::test]
    async fn test_render_json_is_camel_case_array() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "001.sql", "VACUUM FULL bins;");
        let sources = load_sources(&file, None, &GateConfig::default()).await.unwrap();
        let analyses = validate_all(offline_service(), sources).await.unwrap();
        let outcomes: Vec<_> = analyses
            .into_iter()
            .map(|(path, analysis)| GateOutcome {
                verdict: analysis.verdict(50, true),
                analysis,
                path,
            })
            .collect();

        let json = render(&outcomes, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["migrationId"], "001");
        assert_eq!(value[0]["requiresDowntime"], true);
        assert_eq!(value[0]["connectionPoolImpactPercent"], 90);
    }

    #[tokio::test]
    async fn test_json_report_on_stdout_is_the_only_stdout_output() {
        let tmp = TempDir::new().unwrap();
        let migrations = tmp.path().join("migrations");
        std::fs::create_dir_all(&migrations).unwrap();
        write(&migrations, "001_init.sql", "CREATE TABLE users (id uuid PRIMARY KEY);");
        write(&migrations, "002_bins.sql", "CREATE TABLE bins (id int PRIMARY KEY);");
        let config = write(tmp.path(), "gate.yaml", "excluded_files:\n  - 002_bins.sql\n");
        let args = ValidateArgs {
            path: migrations,
            id: None,
            config: Some(config),
            database_url: None,
            engine_version: "16".to_string(),
            pool_utilization: 0,
            max_risk: Some(100),
            format: OutputFormat::Json,
            output: None,
            emit_events: true,
        };

        let mut console = Console::new(Vec::new(), true);
        run(args, &mut console).await.unwrap();

        let stdout = String::from_utf8(console.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let analyses = value.as_array().unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0]["migrationId"], "001_init");
        assert!(!stdout.contains("GATE_EVENT:"));
    }

    #[tokio::test]
    async fn test_text_report_carries_events_and_status() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "001_init.sql", "CREATE TABLE users (id uuid PRIMARY KEY);");
        let args = ValidateArgs {
            path: file,
            id: None,
            config: None,
            database_url: None,
            engine_version: "16".to_string(),
            pool_utilization: 0,
            max_risk: Some(100),
            format: OutputFormat::Text,
            output: None,
            emit_events: true,
        };

        let mut console = Console::new(Vec::new(), false);
        run(args, &mut console).await.unwrap();

        let stdout = String::from_utf8(console.into_inner()).unwrap();
        assert!(stdout.contains("GATE_EVENT:{"));
        assert!(stdout.contains("Migration 001_init"));
        assert!(stdout.contains("1 migration(s) passed the gate"));
    }

    #[tokio::test]
    async fn test_execute_blocks_risky_migration() {
        let tmp = TempDir::new().unwrap();
        let file = write(
            tmp.path(),
            "009_secret.sql",
            "CREATE ROLE app LOGIN PASSWORD = 'hunter2';",
        );
        let args = ValidateArgs {
            path: file,
            id: None,
            config: None,
            database_url: None,
            engine_version: "16".to_string(),
            pool_utilization: 0,
            max_risk: Some(100),
            format: OutputFormat::Json,
            output: Some(tmp.path().join("report.json")),
            emit_events: false,
        };

        let err = execute(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GateError>(),
            Some(GateError::Blocked { blocked: 1, total: 1 })
        ));
        assert!(tmp.path().join("report.json").exists());
    }
}
