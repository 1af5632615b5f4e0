//! # migration-gate
//!
//! Production-safety gate for database migrations. Statically analyses a SQL
//! migration, consults live database metadata and the filesystem, and
//! produces a [`MigrationAnalysis`](domain::MigrationAnalysis): categorized
//! findings plus an aggregate risk and complexity assessment.
//!
//! ```rust,ignore
//! let service = ValidationService::new(metadata, Arc::new(LocalFileLookup), settings);
//! let analysis = service.validate(&source).await;
//! if !analysis.verdict(50, true).passed { /* block the deploy */ }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod observability;
pub mod services;
pub mod ui;
