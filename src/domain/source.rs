//! Migration source handling
//!
//! Migration tools keep the rollback ("down") half in the same file behind a
//! marker comment. Only the "up" half is analysed.

use std::path::{Path, PathBuf};

/// One migration script ready for validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSource {
    pub migration_id: String,
    /// Raw SQL of the "up" half
    pub content: String,
    pub path: PathBuf,
}

impl MigrationSource {
    pub fn new(
        migration_id: impl Into<String>,
        content: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            migration_id: migration_id.into(),
            content: content.into(),
            path: path.into(),
        }
    }

    /// Build from a file's text, cutting at the first down marker.
    ///
    /// The id defaults to the file stem (`001_init` for `001_init.sql`).
    pub fn from_file_content(
        path: &Path,
        raw: &str,
        migration_id: Option<String>,
        down_markers: &[String],
    ) -> Self {
        let migration_id = migration_id.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("migration")
                .to_string()
        });

        Self {
            migration_id,
            content: up_section(raw, down_markers).to_string(),
            path: path.to_path_buf(),
        }
    }
}

/// Text before the first line starting with any down marker (case-insensitive)
pub fn up_section<'a>(raw: &'a str, down_markers: &[String]) -> &'a str {
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim_start().to_lowercase();
        if down_markers
            .iter()
            .any(|marker| !marker.is_empty() && trimmed.starts_with(&marker.to_lowercase()))
        {
            return &raw[..offset];
        }
        offset += line.len();
    }
    raw
}
