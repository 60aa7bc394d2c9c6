//! CLI subcommand implementations.

pub mod aggregate;
pub mod dashboard;
pub mod parse;
pub mod util;
