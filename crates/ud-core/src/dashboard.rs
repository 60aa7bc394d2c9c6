//! Projection of reconciled records into the dashboard schema.
//!
//! The report only has organization-level daily counts, so each user's daily
//! series is an estimate: the user's minutes are spread over the listed days
//! in proportion to the organization's daily events, and the user's daily
//! events are the organization's daily events scaled by the user's share of
//! the organization total.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Organization, ReportDocument, User};

/// The document embedded into the dashboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    pub organizations: Vec<DashboardOrganization>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOrganization {
    pub name: String,
    pub users: Vec<DashboardUser>,
}

impl DashboardOrganization {
    pub fn total_minutes(&self) -> u64 {
        self.users
            .iter()
            .map(|u| u.total_time_minutes)
            .fold(0, u64::saturating_add)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUser {
    pub email: String,
    pub total_time_minutes: u64,
    pub events: u64,
    pub flows: FlowCounts,
    pub daily_data: BTreeMap<NaiveDate, DaySplit>,
}

/// Per-user flow counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounts {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
}

/// One user's estimated activity on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySplit {
    pub time_minutes: f64,
    pub events: u64,
}

/// Rounds to one decimal place, ties to even.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Estimates a user's per-day minutes and events from organization daily counts.
///
/// Days with no organization events are left out. When every listed day has
/// zero events the user's minutes are spread evenly with zero events each.
#[allow(clippy::cast_precision_loss)]
pub fn daily_split(org: &Organization, user: &User) -> BTreeMap<NaiveDate, DaySplit> {
    let mut daily = BTreeMap::new();
    if org.daily_data.is_empty() || user.total_time_minutes == 0 {
        return daily;
    }

    let user_minutes = user.total_time_minutes as f64;
    let org_daily_events = org.daily_events();

    if org_daily_events == 0 {
        let per_day = round_tenth(user_minutes / org.daily_data.len() as f64);
        for day in &org.daily_data {
            daily.insert(
                day.date,
                DaySplit {
                    time_minutes: per_day,
                    events: 0,
                },
            );
        }
        return daily;
    }

    let org_total_events = u128::from(org.total_events.max(1));
    for day in org.daily_data.iter().filter(|d| d.events > 0) {
        let day_fraction = day.events as f64 / org_daily_events as f64;
        let events = u128::from(day.events) * u128::from(user.events) / org_total_events;
        daily.insert(
            day.date,
            DaySplit {
                time_minutes: round_tenth(user_minutes * day_fraction),
                events: u64::try_from(events).unwrap_or(u64::MAX),
            },
        );
    }

    daily
}

fn project_user(org: &Organization, user: &User) -> DashboardUser {
    DashboardUser {
        email: user.email.clone(),
        total_time_minutes: user.total_time_minutes,
        events: user.events,
        flows: FlowCounts {
            started: user.flows,
            completed: 0,
            failed: 0,
        },
        daily_data: daily_split(org, user),
    }
}

/// Projects a reconciled report into the dashboard document.
pub fn project(report: &ReportDocument) -> DashboardDocument {
    let organizations = report
        .customers
        .iter()
        .map(|org| DashboardOrganization {
            name: org.name.clone(),
            users: org.users.iter().map(|u| project_user(org, u)).collect(),
        })
        .collect();

    DashboardDocument {
        organizations,
        start_date: report.date_range.start(),
        end_date: report.date_range.end(),
    }
}
