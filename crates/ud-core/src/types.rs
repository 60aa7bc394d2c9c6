//! Core record types shared by extraction, reconciliation and projection.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The date range ends before it starts.
    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar range covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DateRangeFields")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct DateRangeFields {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range after checking that `start <= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }
}

impl TryFrom<DateRangeFields> for DateRange {
    type Error = ValidationError;

    fn try_from(fields: DateRangeFields) -> Result<Self, Self::Error> {
        Self::new(fields.start, fields.end)
    }
}

/// A single user line from an organization's `Users:` subsection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub events: u64,

    /// Reported session minutes. Rewritten by cap reconciliation.
    pub total_time_minutes: u64,

    /// Flow starts attributed to this user.
    #[serde(default)]
    pub flows: u64,
}

/// Organization-wide event count for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub events: u64,
}

/// Everything extracted from one `### <domain>` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    pub users: Vec<User>,

    /// Sum of user minutes after reconciliation.
    #[serde(default)]
    pub total_time_minutes: u64,

    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub flows_started: u64,
    #[serde(default)]
    pub flows_completed: u64,
    #[serde(default)]
    pub flows_failed: u64,

    #[serde(default)]
    pub daily_data: Vec<DailyCount>,

    /// Labelled "Avg Session Time" upstream, but actually the organization's
    /// total session minutes.
    #[serde(default)]
    pub avg_session_minutes: u64,

    #[serde(default)]
    pub active_users: u64,

    /// Flow success rate in percent.
    #[serde(default)]
    pub success_rate: f64,
}

impl Organization {
    /// Creates an empty record with every numeric field at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: Vec::new(),
            total_time_minutes: 0,
            total_events: 0,
            flows_started: 0,
            flows_completed: 0,
            flows_failed: 0,
            daily_data: Vec::new(),
            avg_session_minutes: 0,
            active_users: 0,
            success_rate: 0.0,
        }
    }

    /// Sum of the organization's listed daily event counts.
    pub fn daily_events(&self) -> u64 {
        self.daily_data
            .iter()
            .map(|d| d.events)
            .fold(0, u64::saturating_add)
    }

    /// Sum of the current per-user minutes.
    pub fn user_minutes(&self) -> u64 {
        self.users
            .iter()
            .map(|u| u.total_time_minutes)
            .fold(0, u64::saturating_add)
    }
}

/// The intermediate record document written by `ud parse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub generated: DateTime<Utc>,
    pub date_range: DateRange,
    pub customers: Vec<Organization>,
}
