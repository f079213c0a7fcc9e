//! Form field detection and context extraction.
//!
//! This crate provides:
//! - [`scan`]: walk a [`Document`](fieldfill_dom::Document), tag and describe every fillable field
//! - [`survey`]: the same descriptors without tagging anything
//! - [`ScanSession`]: the id counter owned by one page session
//! - [`eligibility`]: the visibility / editability predicate
//! - [`label`] and [`context`]: heuristics for the human-readable hints sent to the model

pub mod context;
pub mod eligibility;
pub mod label;
mod scan;

pub use eligibility::Ineligible;
pub use scan::{ScanSession, candidates, scan, survey};

use std::sync::LazyLock;

use regex::Regex;

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(s.trim(), " ").into_owned()
}
