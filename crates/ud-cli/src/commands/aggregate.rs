//! Aggregate command: dashboard document from saved analytics query results.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ud_core::{QueryResults, aggregate};

use super::util::{read_json, write_text};
use crate::Config;

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Saved per-user, per-day activity query results (JSON).
    pub events: PathBuf,

    /// Where to write the dashboard document. Prints to stdout when omitted.
    pub output: Option<PathBuf>,

    /// Saved flow event query results (JSON).
    #[arg(long)]
    pub flows: Option<PathBuf>,
}

pub fn run<W: Write>(writer: &mut W, args: &AggregateArgs, config: &Config) -> Result<()> {
    let activity = read_json::<QueryResults>(&args.events)?.activity_rows();
    let flows = match &args.flows {
        Some(path) => read_json::<QueryResults>(path)?.flow_rows(),
        None => Vec::new(),
    };
    tracing::debug!(
        activity_rows = activity.len(),
        flow_rows = flows.len(),
        "loaded query results"
    );

    let dashboard = aggregate(
        &activity,
        &flows,
        config.date_range()?,
        &config.aggregate_config(),
    );
    let json =
        serde_json::to_string_pretty(&dashboard).context("failed to serialize dashboard data")?;

    match &args.output {
        Some(path) => {
            write_text(path, &json)?;
            writeln!(
                writer,
                "Saved {} organizations to {}",
                dashboard.organizations.len(),
                path.display()
            )?;
        }
        None => writeln!(writer, "{json}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ud_core::DashboardDocument;

    const EVENTS: &str = r#"{"results": [
        ["a@acme.io", "2026-02-03", 10, "2026-02-03T09:00:00Z", "2026-02-03T09:45:00Z", 45],
        ["b@gmail.com", "2026-02-03", 4, null, null, 5]
    ]}"#;

    const FLOWS: &str = r#"{"results": [["a@acme.io", "flow_started", 2]]}"#;

    #[test]
    fn test_aggregate_prints_document_without_output() {
        let temp = tempfile::tempdir().unwrap();
        let events = temp.path().join("events.json");
        std::fs::write(&events, EVENTS).unwrap();

        let args = AggregateArgs {
            events,
            output: None,
            flows: None,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        let doc: DashboardDocument = serde_json::from_slice(&output).unwrap();
        assert_eq!(doc.organizations.len(), 1);
        assert_eq!(doc.organizations[0].name, "acme.io");
        assert_eq!(doc.organizations[0].users[0].total_time_minutes, 45);
        assert_eq!(doc.organizations[0].users[0].flows.started, 0);
    }

    #[test]
    fn test_aggregate_writes_output_with_flows() {
        let temp = tempfile::tempdir().unwrap();
        let events = temp.path().join("events.json");
        let flows = temp.path().join("flows.json");
        let out = temp.path().join("dashboard.json");
        std::fs::write(&events, EVENTS).unwrap();
        std::fs::write(&flows, FLOWS).unwrap();

        let args = AggregateArgs {
            events,
            output: Some(out.clone()),
            flows: Some(flows),
        };
        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        let doc: DashboardDocument =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc.organizations[0].users[0].flows.started, 2);
        assert!(
            String::from_utf8(output)
                .unwrap()
                .starts_with("Saved 1 organizations to ")
        );
    }

    #[test]
    fn test_aggregate_includes_generic_domain_when_not_configured() {
        let temp = tempfile::tempdir().unwrap();
        let events = temp.path().join("events.json");
        std::fs::write(&events, EVENTS).unwrap();

        let config = Config {
            generic_domains: Vec::new(),
            ..Config::default()
        };
        let args = AggregateArgs {
            events,
            output: None,
            flows: None,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let doc: DashboardDocument = serde_json::from_slice(&output).unwrap();
        let names: Vec<_> = doc.organizations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["acme.io", "gmail.com"]);
    }

    #[test]
    fn test_aggregate_accepts_four_column_rows() {
        let temp = tempfile::tempdir().unwrap();
        let events = temp.path().join("events.json");
        std::fs::write(
            &events,
            r#"{"results": [
                ["alice@acme.com", "2025-01-10", 42, 15],
                ["alice@acme.com", "2025-01-11", 30, 10],
                ["bob@acme.com", "2025-01-10", 20, 8],
                ["broken"],
                ["charlie@gmail.com", "2025-01-10", 10, 5]
            ]}"#,
        )
        .unwrap();

        let args = AggregateArgs {
            events,
            output: None,
            flows: None,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        let doc: DashboardDocument = serde_json::from_slice(&output).unwrap();
        assert_eq!(doc.organizations.len(), 1);
        let alice = &doc.organizations[0].users[0];
        assert_eq!(alice.email, "alice@acme.com");
        assert_eq!(alice.total_time_minutes, 25);
        assert_eq!(alice.events, 72);
    }
}
