//! Result parsing - savings segment extraction
//!
//! The provider may embed one cost/waste insight in the response, wrapped
//! in literal markers. Parsing splits it out of the main recommendation;
//! a response without markers passes through unchanged.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::prompt::{SAVINGS_END, SAVINGS_START};

static SAVINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Non-greedy, dot matches newlines: the insight may span lines.
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(SAVINGS_START),
        regex::escape(SAVINGS_END)
    ))
    .expect("savings marker regex is valid")
});

/// A completed response split into its display parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// The recommendation text, markers and insight removed
    pub main: String,
    /// The embedded savings insight, if the provider included one
    pub savings: Option<String>,
}

/// Split a completed response into main text and optional savings insight
///
/// Idempotent: re-parsing an already-stripped main text finds no markers
/// and returns it unchanged.
pub fn parse_response(full: &str) -> ParsedResponse {
    match SAVINGS_RE.captures(full) {
        Some(caps) => {
            debug!("parse_response: savings segment found");
            let savings = caps.get(1).map(|m| m.as_str().trim().to_string());
            let main = SAVINGS_RE.replace(full, "").trim().to_string();
            ParsedResponse { main, savings }
        }
        None => {
            debug!("parse_response: no savings segment");
            ParsedResponse {
                main: full.to_string(),
                savings: None,
            }
        }
    }
}
