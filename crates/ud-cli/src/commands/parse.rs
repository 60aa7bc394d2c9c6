//! Parse command: markdown report to customer record document.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use ud_core::{ReportDocument, parse_report};

use super::util::{format_minutes, read_text, write_text};
use crate::Config;

pub const DEFAULT_REPORT_PATH: &str = "data/sample_report.md";
pub const DEFAULT_CUSTOMER_DATA_PATH: &str = "data/customer_data.json";

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Markdown usage report to read.
    #[arg(default_value = DEFAULT_REPORT_PATH)]
    pub input: PathBuf,

    /// Where to write the customer record document.
    #[arg(default_value = DEFAULT_CUSTOMER_DATA_PATH)]
    pub output: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, args: &ParseArgs, config: &Config) -> Result<()> {
    writeln!(writer, "Parsing {}...", args.input.display())?;
    let text = read_text(&args.input)?;

    let doc = parse_report(
        &text,
        config.date_range()?,
        &config.reconcile_config(),
        Utc::now(),
    );
    writeln!(writer, "Found {} customers", doc.customers.len())?;

    let json = serde_json::to_string_pretty(&doc).context("failed to serialize customer data")?;
    write_text(&args.output, &json)?;
    writeln!(writer, "Saved to {}", args.output.display())?;

    writeln!(writer)?;
    write!(writer, "{}", format_summary(&doc))?;
    Ok(())
}

/// Per-customer totals followed by each user's reconciled minutes.
pub fn format_summary(doc: &ReportDocument) -> String {
    let mut output = String::new();
    writeln!(output, "Summary:").unwrap();
    for customer in &doc.customers {
        writeln!(
            output,
            "  {}: {}, {} users, {} events",
            customer.name,
            format_minutes(customer.total_time_minutes),
            customer.users.len(),
            customer.total_events
        )
        .unwrap();
        for user in &customer.users {
            writeln!(
                output,
                "    {}: {}m, {} events",
                user.email, user.total_time_minutes, user.events
            )
            .unwrap();
        }
    }
    output
}
