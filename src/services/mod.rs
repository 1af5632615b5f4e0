//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Validators reach collaborators only through infrastructure traits.

pub mod validation_service;
pub mod validators;

// Re-export commonly used types
pub use validation_service::ValidationService;
pub use validators::{CategoryValidator, ValidationContext, ValidationSettings};
