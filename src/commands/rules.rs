//! Rules command - lists the pattern rule library

use anyhow::{anyhow, Result};
use colored::Colorize;

use crate::domain::rules::{self, PatternRule};
use crate::domain::ValidationCategory;
use crate::ui;

/// Rules to list, optionally restricted to one category
pub fn select(category: Option<&str>) -> Result<Vec<&'static PatternRule>> {
    match category {
        Some(name) => {
            let category = ValidationCategory::parse(name).ok_or_else(|| {
                let known: Vec<_> = ValidationCategory::ALL.iter().map(|c| c.key()).collect();
                anyhow!(
                    "Unknown category '{}' (expected one of: {})",
                    name,
                    known.join(", ")
                )
            })?;
            Ok(rules::rules_for(category).collect())
        }
        None => Ok(rules::rules().iter().collect()),
    }
}

pub fn execute(category: Option<String>) -> Result<()> {
    let selected = select(category.as_deref())?;

    ui::print_header("Migration gate rule library");
    for rule in &selected {
        println!("{}", ui::render_rule(rule));
    }
    println!();
    println!(
        "{}",
        format!("{} rule(s)", selected.len()).bold()
    );
    if category.is_none() {
        ui::print_info(
            "Foreign key indexing, table naming, SRID consistency, connection pool, \
             rollback and engine version checks run inside their validators",
        );
    }

    Ok(())
}
