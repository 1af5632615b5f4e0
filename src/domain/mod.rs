//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod analysis;
pub mod analyzer;
pub mod finding;
pub mod rules;
pub mod source;

// Re-export commonly used types
pub use analysis::{
    Complexity, GateVerdict, MigrationAnalysis, OperationCounts, RollbackComplexity,
};
pub use finding::{Severity, ValidationCategory, ValidationResult, ValidationStatus};
pub use rules::PatternRule;
pub use source::MigrationSource;
