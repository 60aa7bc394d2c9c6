//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::aggregate::AggregateArgs;
use crate::commands::dashboard::DashboardArgs;
use crate::commands::parse::ParseArgs;

/// Usage dashboard data pipeline.
///
/// Turns the markdown usage report into normalized JSON and embeds it into
/// the static dashboard page.
#[derive(Debug, Parser)]
#[command(name = "ud", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a markdown usage report into the customer record document.
    Parse(ParseArgs),

    /// Project a customer record document and embed it into the dashboard page.
    Dashboard(DashboardArgs),

    /// Build the dashboard document from saved analytics query results.
    Aggregate(AggregateArgs),
}
