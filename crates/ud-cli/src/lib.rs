//! Usage dashboard CLI library.
//!
//! This crate provides the CLI interface for the usage dashboard pipeline.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
