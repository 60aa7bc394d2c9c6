//! Integration tests for the report pipeline against a fixture report.
//!
//! Tests the full flow: extract → reconcile → project → embed.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, TimeZone, Utc};
use ud_core::{
    DateRange, Organization, ReconcileConfig, ReportDocument, embed_document, extract_embedded,
    parse_report, project,
};

const REPORT: &str = include_str!("fixtures/sample_report.md");

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn parsed() -> ReportDocument {
    parse_report(
        REPORT,
        DateRange::new(date(2025, 12, 14), date(2026, 2, 12)).unwrap(),
        &ReconcileConfig::default(),
        Utc.with_ymd_and_hms(2026, 2, 12, 12, 0, 0).unwrap(),
    )
}

fn customers(doc: &ReportDocument) -> HashMap<&str, &Organization> {
    doc.customers.iter().map(|c| (c.name.as_str(), c)).collect()
}

fn minutes_of(org: &Organization, needle: &str) -> u64 {
    org.users
        .iter()
        .find(|u| u.email.contains(needle))
        .map(|u| u.total_time_minutes)
        .unwrap()
}

// ========== Extraction ==========

#[test]
fn test_customers_with_users_are_kept_in_report_order() {
    let doc = parsed();
    let names: Vec<_> = doc.customers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["theamazonwhisperer.com", "marketrocket.co.uk", "enflet.io"]
    );
}

#[test]
fn test_theamazonwhisperer_fields() {
    let doc = parsed();
    let taw = customers(&doc)["theamazonwhisperer.com"];

    assert_eq!(taw.active_users, 3);
    assert_eq!(taw.total_events, 71_214);
    assert_eq!(taw.avg_session_minutes, 1681);
    assert_eq!(taw.flows_started, 731);
    assert_eq!(taw.flows_completed, 240);
    assert_eq!(taw.flows_failed, 3383);
    assert!((taw.success_rate - 32.8).abs() < 0.05);
    assert_eq!(taw.users.len(), 3);

    let user_flows: u64 = taw.users.iter().map(|u| u.flows).sum();
    assert_eq!(user_flows, taw.flows_started);
}

#[test]
fn test_daily_activity_values() {
    let doc = parsed();
    let by_name = customers(&doc);

    let taw = by_name["theamazonwhisperer.com"];
    let daily: HashMap<_, _> = taw.daily_data.iter().map(|d| (d.date, d.events)).collect();
    assert_eq!(daily[&date(2026, 2, 3)], 1721);
    assert_eq!(daily[&date(2026, 2, 4)], 3609);
    assert_eq!(taw.daily_events(), 11_100);
    assert!(taw.daily_events() < taw.total_events);

    let mr = by_name["marketrocket.co.uk"];
    assert_eq!(mr.daily_events(), 502);
    assert_eq!(mr.daily_events(), mr.total_events);
}

// ========== Reconciliation ==========

#[test]
fn test_theamazonwhisperer_reconciles_to_budget() {
    let doc = parsed();
    let taw = customers(&doc)["theamazonwhisperer.com"];

    assert_eq!(taw.total_time_minutes, 1681);
    assert!(minutes_of(taw, "ryan") > minutes_of(taw, "alex"));
    assert_eq!(minutes_of(taw, "ben.w"), 5);
}

#[test]
fn test_marketrocket_keeps_idle_user_at_zero() {
    let doc = parsed();
    let mr = customers(&doc)["marketrocket.co.uk"];

    assert_eq!(minutes_of(mr, "sam"), 0);
    assert_eq!(minutes_of(mr, "tom"), 45);
}

#[test]
fn test_totals_equal_sum_of_users() {
    for customer in &parsed().customers {
        let sum: u64 = customer.users.iter().map(|u| u.total_time_minutes).sum();
        assert_eq!(customer.total_time_minutes, sum, "{}", customer.name);
    }
}

#[test]
fn test_uncapped_org_is_untouched() {
    let doc = parsed();
    let enflet = customers(&doc)["enflet.io"];
    assert_eq!(enflet.total_time_minutes, 38);
    assert!((enflet.success_rate - 100.0).abs() < f64::EPSILON);
}

// ========== Projection and Embedding ==========

#[test]
fn test_projection_preserves_organizations_and_times() {
    let doc = parsed();
    let dashboard = project(&doc);

    assert_eq!(dashboard.organizations.len(), doc.customers.len());
    for (org, customer) in dashboard.organizations.iter().zip(&doc.customers) {
        assert_eq!(org.name, customer.name);
        assert_eq!(org.total_minutes(), customer.total_time_minutes);
        for user in &org.users {
            assert_eq!(user.flows.completed, 0);
            assert_eq!(user.flows.failed, 0);
        }
    }
}

#[test]
#[allow(clippy::cast_precision_loss)]
fn test_projected_daily_split_covers_user_time() {
    let dashboard = project(&parsed());
    for org in &dashboard.organizations {
        for user in &org.users {
            if user.total_time_minutes == 0 {
                assert!(user.daily_data.is_empty());
                continue;
            }
            let total = user.total_time_minutes as f64;
            let sum: f64 = user.daily_data.values().map(|d| d.time_minutes).sum();
            let tolerance = 0.05 * user.daily_data.len() as f64 + 1e-9;
            assert!((sum - total).abs() <= tolerance, "{}: {sum}", user.email);
        }
    }
}

#[test]
fn test_embed_round_trip_keeps_organization_names() {
    let doc = parsed();
    let dashboard = project(&doc);
    let page = "<html><script>\nconst TIME_SERIES_DATA = {\"organizations\": []};\n</script></html>";

    let embedded = embed_document(page, "TIME_SERIES_DATA", &dashboard).unwrap();
    assert_eq!(embedded.replacements, 1);

    let back = extract_embedded(&embedded.html, "TIME_SERIES_DATA").unwrap();
    let names: BTreeSet<_> = back.organizations.iter().map(|o| o.name.clone()).collect();
    let expected: BTreeSet<_> = doc.customers.iter().map(|c| c.name.clone()).collect();
    assert_eq!(back.organizations.len(), doc.customers.len());
    assert_eq!(names, expected);
}

#[test]
fn test_report_document_json_shape() {
    let json = serde_json::to_value(parsed()).unwrap();

    assert_eq!(json["dateRange"]["start"], "2025-12-14");
    assert_eq!(json["dateRange"]["end"], "2026-02-12");
    assert_eq!(json["customers"][0]["name"], "theamazonwhisperer.com");
    assert_eq!(json["customers"][0]["totalTimeMinutes"], 1681);
    assert!(json["generated"].as_str().unwrap().starts_with("2026-02-12T12:00:00"));
}
