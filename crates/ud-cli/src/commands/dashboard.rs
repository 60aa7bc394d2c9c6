//! Dashboard command: project customer records and embed them into the page.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Args;

use ud_core::{DashboardDocument, ReportDocument, embed_document, extract_embedded, project};

use super::parse::DEFAULT_CUSTOMER_DATA_PATH;
use super::util::{format_minutes, read_json, read_text, write_text};
use crate::Config;

pub const DEFAULT_DASHBOARD_PATH: &str = "dashboard.html";

const TOP_ORGANIZATIONS: usize = 5;
const PREVIEW_DAYS: usize = 5;

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Customer record document produced by `ud parse`.
    #[arg(default_value = DEFAULT_CUSTOMER_DATA_PATH)]
    pub input: PathBuf,

    /// Dashboard page to embed the data into.
    #[arg(default_value = DEFAULT_DASHBOARD_PATH)]
    pub target: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, args: &DashboardArgs, config: &Config) -> Result<()> {
    let report: ReportDocument = read_json(&args.input)?;
    let dashboard = project(&report);

    let html = read_text(&args.target)?;
    let embedded = embed_document(&html, &config.embed_constant, &dashboard)
        .context("failed to embed dashboard data")?;
    if embedded.replacements == 0 {
        tracing::warn!(
            target_page = %args.target.display(),
            constant = %config.embed_constant,
            "no data declaration found; page left unchanged"
        );
    }
    write_text(&args.target, &embedded.html)?;
    if embedded.replacements > 0 {
        verify_page(&args.target, &config.embed_constant, &dashboard)?;
    }

    writeln!(writer, "Embedded data into {}", args.target.display())?;
    write!(writer, "{}", format_summary(&dashboard))?;
    Ok(())
}

/// Re-reads the written page and checks the embedded data parses back intact.
fn verify_page(target: &Path, constant: &str, expected: &DashboardDocument) -> Result<()> {
    let html = read_text(target)?;
    let embedded = extract_embedded(&html, constant)
        .with_context(|| format!("failed to read back data from {}", target.display()))?;
    ensure!(
        embedded.organizations.len() == expected.organizations.len()
            && embedded.start_date == expected.start_date
            && embedded.end_date == expected.end_date,
        "data read back from {} does not match what was written",
        target.display()
    );
    Ok(())
}

/// Organization count, date range and the organizations with the most time.
pub fn format_summary(dashboard: &DashboardDocument) -> String {
    let mut output = String::new();
    writeln!(output, "Organizations: {}", dashboard.organizations.len()).unwrap();
    writeln!(
        output,
        "Date range: {} to {}",
        dashboard.start_date, dashboard.end_date
    )
    .unwrap();
    writeln!(output, "Top {TOP_ORGANIZATIONS} by time:").unwrap();

    let mut ranked: Vec<_> = dashboard.organizations.iter().collect();
    ranked.sort_by_key(|org| std::cmp::Reverse(org.total_minutes()));

    for org in ranked.into_iter().take(TOP_ORGANIZATIONS) {
        writeln!(
            output,
            "  {}: {} ({} users)",
            org.name,
            format_minutes(org.total_minutes()),
            org.users.len()
        )
        .unwrap();
        for user in &org.users {
            let daily: Vec<f64> = user
                .daily_data
                .values()
                .take(PREVIEW_DAYS)
                .map(|d| d.time_minutes)
                .collect();
            writeln!(
                output,
                "    {}: {}m total, daily: {daily:?}...",
                user.email, user.total_time_minutes
            )
            .unwrap();
        }
    }
    output
}
