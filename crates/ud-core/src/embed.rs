//! Splicing the dashboard document into a host HTML page.
//!
//! The page declares the data as `const <NAME> = {...};`. Embedding replaces
//! every such declaration textually; reading it back parses the first one.

use regex::{NoExpand, Regex};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

use crate::dashboard::DashboardDocument;

/// Constant the stock dashboard page declares its data under.
pub const DEFAULT_EMBED_CONSTANT: &str = "TIME_SERIES_DATA";

const EMBED_INDENT: &[u8] = b"        ";

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no `const {constant} = {{...}};` declaration found")]
    MissingDeclaration { constant: String },

    #[error("invalid constant name pattern")]
    Pattern(#[from] regex::Error),

    #[error("embedded data is not a valid dashboard document")]
    InvalidJson(#[from] serde_json::Error),
}

/// A host page after embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedded {
    pub html: String,
    /// Number of declarations replaced. Zero means the page was left as is.
    pub replacements: usize,
}

fn declaration_pattern(constant: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?s)const {}\s*=\s*(\{{.*?\}});",
        regex::escape(constant)
    ))
}

/// Serializes `doc` with the page's eight-space indentation.
pub fn to_embedded_json(doc: &DashboardDocument) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(EMBED_INDENT));
    doc.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Replaces every `const <constant> = {...};` block in `html` with `doc`.
///
/// A page without the declaration is returned unchanged with zero
/// replacements.
pub fn embed_document(
    html: &str,
    constant: &str,
    doc: &DashboardDocument,
) -> Result<Embedded, EmbedError> {
    let pattern = declaration_pattern(constant)?;
    let replacement = format!("const {constant} = {};", to_embedded_json(doc)?);

    let replacements = pattern.find_iter(html).count();
    let html = pattern
        .replace_all(html, NoExpand(&replacement))
        .into_owned();

    Ok(Embedded { html, replacements })
}

/// Reads the document back out of a page produced by [`embed_document`].
pub fn extract_embedded(html: &str, constant: &str) -> Result<DashboardDocument, EmbedError> {
    let pattern = declaration_pattern(constant)?;
    let caps = pattern
        .captures(html)
        .ok_or_else(|| EmbedError::MissingDeclaration {
            constant: constant.to_string(),
        })?;
    Ok(serde_json::from_str(&caps[1])?)
}
