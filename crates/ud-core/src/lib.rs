//! Core domain logic for the usage dashboard.
//!
//! This crate contains the fundamental types and logic for:
//! - Extraction: reading organization sections out of the markdown usage report
//! - Reconciliation: undoing the upstream per-user session cap
//! - Projection: reshaping reconciled records into the dashboard schema
//! - Embedding: splicing the dashboard document into its host page

pub mod activity;
pub mod dashboard;
pub mod embed;
pub mod extract;
pub mod reconcile;
pub mod types;

pub use activity::{ActivityRow, AggregateConfig, FlowRow, QueryResults, aggregate};
pub use dashboard::{DashboardDocument, project};
pub use embed::{DEFAULT_EMBED_CONSTANT, EmbedError, Embedded, embed_document, extract_embedded};
pub use extract::{Line, Subsection, classify_line, extract_organizations, parse_report};
pub use reconcile::{
    CapCorrection, DEFAULT_CAP_MINUTES, ReconcileConfig, apportion, is_capped, reconcile,
};
pub use types::{DailyCount, DateRange, Organization, ReportDocument, User, ValidationError};
