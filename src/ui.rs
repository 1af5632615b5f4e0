// Terminal UI utilities
// Text rendering of analysis reports lives here; JSON output goes through serde.

use colored::{ColoredString, Colorize};
use std::io::{self, Write};

use crate::domain::{
    GateVerdict, MigrationAnalysis, Severity, ValidationResult, ValidationStatus,
};
use crate::domain::rules::PatternRule;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

/// Report and status output of one gate run
///
/// The report always goes to `out`. Status lines follow it unless `out`
/// carries a machine-readable report, in which case they go to stderr so
/// the report stays parseable.
pub struct Console<W: Write> {
    out: W,
    status_to_stderr: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, status_to_stderr: bool) -> Self {
        Self {
            out,
            status_to_stderr,
        }
    }

    pub fn report(&mut self, report: &str) -> io::Result<()> {
        self.out.write_all(report.as_bytes())?;
        self.out.flush()
    }

    /// A plain line on the status stream
    pub fn line(&mut self, line: &str) -> io::Result<()> {
        if self.status_to_stderr {
            eprintln!("{}", line);
            Ok(())
        } else {
            writeln!(self.out, "{}", line)
        }
    }

    pub fn success(&mut self, message: &str) -> io::Result<()> {
        self.line(&format!("✅ {}", message).bright_green().bold().to_string())
    }

    pub fn info(&mut self, message: &str) -> io::Result<()> {
        self.line(&format!("ℹ️  {}", message).bright_cyan().to_string())
    }

    pub fn warning(&mut self, message: &str) -> io::Result<()> {
        self.line(&format!("⚠️  {}", message).bright_yellow().to_string())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("{:<8}", severity.to_string());
    match severity {
        Severity::Critical => label.bright_red().bold(),
        Severity::Error => label.red(),
        Severity::Warning => label.yellow(),
        Severity::Info => label.bright_cyan(),
    }
}

fn status_icon(result: &ValidationResult) -> &'static str {
    match result.status {
        ValidationStatus::Passed => "✅",
        ValidationStatus::Skipped => "⏭️ ",
        ValidationStatus::Warning => "⚠️ ",
        ValidationStatus::Failed => "❌",
    }
}

/// Text report for one analysed migration
pub fn render_analysis(analysis: &MigrationAnalysis, verdict: &GateVerdict) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n",
        format!("Migration {}", analysis.migration_id).bold()
    ));
    out.push_str(&format!(
        "   Risk score: {}/100   Complexity: {}   Duration: ~{}s\n",
        analysis.risk_score, analysis.complexity, analysis.estimated_duration_seconds
    ));
    out.push_str(&format!(
        "   Operations: {} (tables {}, indexes {}, data {}, constraints {})\n",
        analysis.total_operations(),
        analysis.operation_counts.table_operations,
        analysis.operation_counts.index_operations,
        analysis.operation_counts.data_operations,
        analysis.operation_counts.constraint_operations,
    ));
    out.push_str(&format!(
        "   Downtime: {}   Pool impact: {}%   Rollback: {}\n",
        if analysis.requires_downtime { "yes" } else { "no" },
        analysis.connection_pool_impact_percent,
        analysis.rollback_complexity
    ));
    if !analysis.impacted_tables.is_empty() {
        out.push_str(&format!(
            "   Tables: {}\n",
            analysis.impacted_tables.join(", ")
        ));
    }
    if !analysis.impacted_indexes.is_empty() {
        out.push_str(&format!(
            "   Indexes: {}\n",
            analysis.impacted_indexes.join(", ")
        ));
    }

    let mut current = None;
    for result in &analysis.validation_results {
        if current != Some(result.category) {
            current = Some(result.category);
            out.push_str(&format!("\n   {}\n", result.category.to_string().bold()));
        }
        out.push_str(&format!(
            "   {} {} {}: {}\n",
            status_icon(result),
            severity_label(result.severity),
            result.test_name,
            result.message
        ));
        for recommendation in &result.recommendations {
            out.push_str(&format!("        → {}\n", recommendation.dimmed()));
        }
    }

    out.push('\n');
    if verdict.passed {
        out.push_str(&format!("   {} Gate passed\n", "✅".green()));
    } else {
        out.push_str(&format!("   {} Gate blocked\n", "❌".red()));
        for reason in &verdict.reasons {
            out.push_str(&format!("      - {}\n", reason));
        }
    }

    out
}

/// One line per library rule
pub fn render_rule(rule: &PatternRule) -> String {
    format!(
        "{} {:<28} {:<16} {}",
        severity_label(rule.severity),
        rule.test_name,
        rule.category.key(),
        rule.message
    )
}
