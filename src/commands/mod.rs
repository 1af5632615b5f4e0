//! Command implementations, one module per subcommand

pub mod rules;
pub mod validate;
