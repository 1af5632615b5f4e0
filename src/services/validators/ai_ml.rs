//! AI/ML validator: pgvector prerequisites and approximate-neighbour indexes
//!
//! Only invoked when the script mentions vector/ML syntax; see
//! [`rules::mentions_ai_ml`].

use async_trait::async_trait;

use super::{or_passed, CategoryValidator, ValidationContext};
use crate::domain::rules;
use crate::domain::{ValidationCategory, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct AiMlValidator;

#[async_trait]
impl CategoryValidator for AiMlValidator {
    fn category(&self) -> ValidationCategory {
        ValidationCategory::AiMl
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        or_passed(
            rules::evaluate(ValidationCategory::AiMl, ctx.sql()),
            ValidationCategory::AiMl,
            "AI/ML validation passed",
        )
    }
}
