//! Building the dashboard document directly from analytics query rows.
//!
//! This bypasses the markdown report: per-user, per-day activity rows carry
//! real daily granularity, so no cap correction or daily estimation is
//! needed. Users are grouped into organizations by e-mail domain.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::dashboard::{
    DashboardDocument, DashboardOrganization, DashboardUser, DaySplit, FlowCounts,
};
use crate::types::DateRange;

/// Per-user per-day ceiling on estimated active minutes.
pub const DEFAULT_DAILY_TIME_CAP_MINUTES: f64 = 480.0;

/// Personal e-mail providers that never identify an organization.
pub const DEFAULT_GENERIC_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "protonmail.com",
    "aol.com",
    "mail.com",
    "mozmail.com",
];

/// Configuration for activity aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateConfig {
    /// Default: 480 (8 hours).
    pub daily_time_cap_minutes: f64,

    /// Lowercase domains excluded from grouping.
    pub generic_domains: Vec<String>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            daily_time_cap_minutes: DEFAULT_DAILY_TIME_CAP_MINUTES,
            generic_domains: DEFAULT_GENERIC_DOMAINS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Saved query response: `{"results": [[...], ...]}`.
///
/// Rows stay as raw JSON until decoded so one malformed row is skipped
/// instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResults {
    #[serde(default)]
    pub results: Vec<Value>,
}

impl QueryResults {
    /// Decodes activity rows, skipping malformed ones.
    pub fn activity_rows(&self) -> Vec<ActivityRow> {
        decode_rows(&self.results, "activity", ActivityRow::from_columns)
    }

    /// Decodes flow counter rows, skipping malformed ones.
    pub fn flow_rows(&self) -> Vec<FlowRow> {
        decode_rows(&self.results, "flow", FlowRow::from_columns)
    }
}

fn decode_rows<T>(rows: &[Value], kind: &str, decode: fn(&[Value]) -> Option<T>) -> Vec<T> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let decoded = row.as_array().and_then(|columns| decode(columns));
            if decoded.is_none() {
                tracing::debug!(kind, row = idx, value = %row, "skipping malformed query row");
            }
            decoded
        })
        .collect()
}

/// Email column: a string, or null for anonymous activity.
fn email_column(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(email) => Some(Some(email.clone())),
        _ => None,
    }
}

/// One `(email, day)` activity row.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub email: Option<String>,
    pub day: String,
    pub event_count: u64,
    pub active_minutes: Option<f64>,
}

impl ActivityRow {
    /// Decodes `[email, day, events, minutes]` or
    /// `[email, day, events, first event, last event, minutes]`.
    ///
    /// Active minutes always come from the last column.
    pub fn from_columns(columns: &[Value]) -> Option<Self> {
        let [email, day, events, .., minutes] = columns else {
            return None;
        };
        if !matches!(columns.len(), 4 | 6) {
            return None;
        }
        let active_minutes = match minutes {
            Value::Null => None,
            other => Some(other.as_f64()?),
        };
        Some(Self {
            email: email_column(email)?,
            day: day.as_str()?.to_string(),
            event_count: events.as_u64()?,
            active_minutes,
        })
    }
}

/// One `(email, event)` flow counter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRow {
    pub email: Option<String>,
    pub event: String,
    pub count: u64,
}

impl FlowRow {
    /// Decodes `[email, event name, count]`.
    pub fn from_columns(columns: &[Value]) -> Option<Self> {
        let [email, event, count] = columns else {
            return None;
        };
        Some(Self {
            email: email_column(email)?,
            event: event.as_str()?.to_string(),
            count: count.as_u64()?,
        })
    }
}

/// Which flow counter an event name feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Started,
    Completed,
    Failed,
}

impl FlowOutcome {
    /// Classifies names like `flow_started`, `Flow Completed` or `$flow_failed`.
    pub fn from_event_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase().replace('$', "");
        if name.contains("started") {
            Some(Self::Started)
        } else if name.contains("completed") {
            Some(Self::Completed)
        } else if name.contains("failed") {
            Some(Self::Failed)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct UserActivity {
    events: u64,
    minutes: f64,
    flows: FlowCounts,
    daily: BTreeMap<NaiveDate, DaySplit>,
}

/// Rounds to one decimal place with halves going up.
fn round_tenth_half_up(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

fn normalize_email(email: Option<&str>) -> Option<String> {
    let email = email?.trim().to_lowercase();
    email.contains('@').then_some(email)
}

/// Takes the calendar date from values like `2026-02-03` or `2026-02-03 00:00:00`.
fn parse_day(day: &str) -> Option<NaiveDate> {
    let date_part = day.split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Aggregates activity and flow rows into the dashboard document.
///
/// Organizations are ordered by domain and users by e-mail.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn aggregate(
    activity: &[ActivityRow],
    flows: &[FlowRow],
    date_range: DateRange,
    config: &AggregateConfig,
) -> DashboardDocument {
    let mut users: BTreeMap<String, UserActivity> = BTreeMap::new();

    for row in activity {
        let Some(email) = normalize_email(row.email.as_deref()) else {
            continue;
        };
        let Some(day) = parse_day(&row.day) else {
            tracing::debug!(email = %email, day = %row.day, "skipping row with unparseable day");
            continue;
        };

        let estimate = row
            .active_minutes
            .unwrap_or(0.0)
            .max(0.0)
            .min(config.daily_time_cap_minutes);

        let entry = users.entry(email).or_default();
        entry.events = entry.events.saturating_add(row.event_count);
        entry.minutes += estimate;
        entry.daily.insert(
            day,
            DaySplit {
                time_minutes: round_tenth_half_up(estimate),
                events: row.event_count,
            },
        );
    }

    for row in flows {
        let Some(email) = normalize_email(row.email.as_deref()) else {
            continue;
        };
        let Some(entry) = users.get_mut(&email) else {
            continue;
        };
        match FlowOutcome::from_event_name(&row.event) {
            Some(FlowOutcome::Started) => {
                entry.flows.started = entry.flows.started.saturating_add(row.count);
            }
            Some(FlowOutcome::Completed) => {
                entry.flows.completed = entry.flows.completed.saturating_add(row.count);
            }
            Some(FlowOutcome::Failed) => {
                entry.flows.failed = entry.flows.failed.saturating_add(row.count);
            }
            None => {}
        }
    }

    let mut orgs: BTreeMap<String, Vec<DashboardUser>> = BTreeMap::new();
    for (email, user) in users {
        let Some(domain) = email.split('@').nth(1).filter(|d| !d.is_empty()) else {
            continue;
        };
        if config.generic_domains.iter().any(|g| g == domain) {
            continue;
        }
        let domain = domain.to_string();
        orgs.entry(domain).or_default().push(DashboardUser {
            email,
            total_time_minutes: user.minutes.round() as u64,
            events: user.events,
            flows: user.flows,
            daily_data: user.daily,
        });
    }

    DashboardDocument {
        organizations: orgs
            .into_iter()
            .map(|(name, users)| DashboardOrganization { name, users })
            .collect(),
        start_date: date_range.start(),
        end_date: date_range.end(),
    }
}
