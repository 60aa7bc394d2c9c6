use std::io::stdout;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ud_cli::commands::{aggregate, dashboard, parse};
use ud_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut out = stdout().lock();
    match command {
        Commands::Parse(args) => parse::run(&mut out, args, &config)?,
        Commands::Dashboard(args) => dashboard::run(&mut out, args, &config)?,
        Commands::Aggregate(args) => aggregate::run(&mut out, args, &config)?,
    }

    Ok(())
}
