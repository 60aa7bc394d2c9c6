//! Markdown report extraction.
//!
//! The report is a sequence of `### <domain>` sections. Each line of a
//! section is classified on its own; the only state carried between lines is
//! which labelled subsection (`Users:` or `Daily Activity:`) is open and
//! whether a `---` rule has closed the section early.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::reconcile::{ReconcileConfig, reconcile};
use crate::types::{DailyCount, DateRange, Organization, ReportDocument, User};

static BOLD_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([0-9,]+)\*\*").unwrap());

static AVG_SESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~([0-9,]+)\s+minutes").unwrap());

static STARTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Started:\s*([0-9,]+)").unwrap());

static COMPLETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Completed:\s*([0-9,]+)").unwrap());

static FAILED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Failed:\s*([0-9,]+)").unwrap());

static SUCCESS_RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Success Rate:\s*([0-9.]+)%").unwrap());

static DAILY_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*(\d{4}-\d{2}-\d{2}):\s*([0-9,]+)\s+events?\b").unwrap()
});

static USER_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*([^:]+):\s*([0-9,]+)\s+events?,\s*([0-9,]+)m\s+time,\s*([0-9,]+)\s+flows?\b")
        .unwrap()
});

/// Which labelled list the extractor is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsection {
    #[default]
    None,
    DailyActivity,
    Users,
}

/// Classification of a single report line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// `### <domain>` opens a new organization section.
    Header(String),
    /// A line of three or more dashes closes the current section.
    SectionEnd,
    ActiveUsers(u64),
    TotalEvents(u64),
    AvgSessionMinutes(u64),
    FlowsStarted(u64),
    FlowsCompleted(u64),
    FlowsFailed(u64),
    SuccessRate(f64),
    DailyActivityMarker,
    UsersMarker,
    Daily(DailyCount),
    User(User),
    /// Anything else. Expected for free text, never an error.
    Unrecognized,
}

/// Parses a count, ignoring thousands separators.
fn parse_count(s: &str) -> Option<u64> {
    s.replace(',', "").parse().ok()
}

fn captured_count(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line).and_then(|caps| parse_count(&caps[1]))
}

/// Returns the domain if `raw` is an organization header.
fn section_header(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("###")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

fn parse_daily(line: &str) -> Option<DailyCount> {
    let caps = DAILY_ENTRY_RE.captures(line)?;
    Some(DailyCount {
        date: NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?,
        events: parse_count(&caps[2])?,
    })
}

fn parse_user(line: &str) -> Option<User> {
    let caps = USER_ENTRY_RE.captures(line)?;
    Some(User {
        email: caps[1].trim().to_string(),
        events: parse_count(&caps[2])?,
        total_time_minutes: parse_count(&caps[3])?,
        flows: parse_count(&caps[4])?,
    })
}

/// Classifies one raw report line given the currently open subsection.
///
/// Labelled fields are recognized anywhere in a section. List entries are
/// only recognized inside their own subsection.
pub fn classify_line(raw: &str, subsection: Subsection) -> Line {
    if let Some(name) = section_header(raw) {
        return Line::Header(name.to_string());
    }

    let line = raw.trim();
    let matched = if line.starts_with("---") {
        Some(Line::SectionEnd)
    } else if line.contains("Active Users:") {
        captured_count(&BOLD_NUMBER_RE, line).map(Line::ActiveUsers)
    } else if line.contains("Total Events:") {
        captured_count(&BOLD_NUMBER_RE, line).map(Line::TotalEvents)
    } else if line.contains("Avg Session Time:") {
        captured_count(&AVG_SESSION_RE, line).map(Line::AvgSessionMinutes)
    } else if line.contains("- Started:") {
        captured_count(&STARTED_RE, line).map(Line::FlowsStarted)
    } else if line.contains("- Completed:") {
        captured_count(&COMPLETED_RE, line).map(Line::FlowsCompleted)
    } else if line.contains("- Failed:") {
        captured_count(&FAILED_RE, line).map(Line::FlowsFailed)
    } else if line.contains("- Success Rate:") {
        SUCCESS_RATE_RE
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
            .map(Line::SuccessRate)
    } else if line.contains("**Daily Activity:**") {
        Some(Line::DailyActivityMarker)
    } else if line.contains("**Users:**") {
        Some(Line::UsersMarker)
    } else {
        match subsection {
            Subsection::DailyActivity => parse_daily(line).map(Line::Daily),
            Subsection::Users => parse_user(line).map(Line::User),
            Subsection::None => None,
        }
    };

    matched.unwrap_or(Line::Unrecognized)
}

/// Accumulator for the section currently being read.
#[derive(Debug)]
struct Section {
    org: Organization,
    subsection: Subsection,
    closed: bool,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            org: Organization::new(name),
            subsection: Subsection::None,
            closed: false,
        }
    }

    fn apply(&mut self, line: Line, line_number: usize) {
        let org = &mut self.org;
        match line {
            Line::Header(_) => {}
            Line::SectionEnd => self.closed = true,
            Line::ActiveUsers(n) => org.active_users = n,
            Line::TotalEvents(n) => org.total_events = n,
            Line::AvgSessionMinutes(n) => org.avg_session_minutes = n,
            Line::FlowsStarted(n) => org.flows_started = n,
            Line::FlowsCompleted(n) => org.flows_completed = n,
            Line::FlowsFailed(n) => org.flows_failed = n,
            Line::SuccessRate(rate) => org.success_rate = rate,
            Line::DailyActivityMarker => self.subsection = Subsection::DailyActivity,
            Line::UsersMarker => self.subsection = Subsection::Users,
            Line::Daily(day) => org.daily_data.push(day),
            Line::User(user) => org.users.push(user),
            Line::Unrecognized => {
                if self.subsection != Subsection::None {
                    tracing::debug!(
                        line = line_number,
                        organization = %org.name,
                        "skipping unrecognized line"
                    );
                }
            }
        }
    }

    /// Reconciles the section and keeps it only if it listed any users.
    fn finish(mut self, config: &ReconcileConfig, out: &mut Vec<Organization>) {
        reconcile(&mut self.org, config);
        if self.org.users.is_empty() {
            tracing::debug!(organization = %self.org.name, "dropping organization without users");
            return;
        }
        out.push(self.org);
    }
}

/// Extracts and reconciles every organization section in `text`.
///
/// Lines before the first header are ignored. Organizations with no parsed
/// users are dropped.
pub fn extract_organizations(text: &str, config: &ReconcileConfig) -> Vec<Organization> {
    let mut organizations = Vec::new();
    let mut current: Option<Section> = None;

    for (idx, raw) in text.lines().enumerate() {
        let Some(section) = current.as_mut() else {
            if let Some(name) = section_header(raw) {
                current = Some(Section::new(name));
            }
            continue;
        };

        match classify_line(raw, section.subsection) {
            Line::Header(name) => {
                if let Some(done) = current.replace(Section::new(&name)) {
                    done.finish(config, &mut organizations);
                }
            }
            _ if section.closed => {}
            line => section.apply(line, idx + 1),
        }
    }

    if let Some(done) = current {
        done.finish(config, &mut organizations);
    }

    organizations
}

/// Builds the intermediate record document for a report.
pub fn parse_report(
    text: &str,
    date_range: DateRange,
    config: &ReconcileConfig,
    generated: DateTime<Utc>,
) -> ReportDocument {
    ReportDocument {
        generated,
        date_range,
        customers: extract_organizations(text, config),
    }
}
