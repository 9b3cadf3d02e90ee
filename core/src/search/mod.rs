//! Linear keyword search shared by the document and note managers.
//!
//! A search walks every record of an index and asks for a [`ScanOutcome`] per record.
//! Records that cannot be scanned (content missing, unsupported type, read or
//! extraction failure) are skipped and never abort the search.

mod extract;

pub use extract::{media_type_for, ExtractError, Extractors, MarkdownExtractor, PlainTextExtractor, TextExtractor};

use std::fmt;

use tracing::debug;

/// A normalized, non-empty search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    needle: String,
}

impl Keyword {
    /// Returns `None` for an empty keyword, which callers answer with an empty result.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Keyword { needle: raw.to_lowercase() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Case-insensitive substring test.
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.needle)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.needle)
    }
}

/// Why a record was left out of a search without being compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingContent,
    UnsupportedType(String),
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingContent => f.write_str("content file missing"),
            SkipReason::UnsupportedType(file_type) => write!(f, "no text extractor for '{}'", file_type),
            SkipReason::Unreadable(cause) => write!(f, "unreadable: {}", cause),
        }
    }
}

/// Result of scanning one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Match,
    NoMatch,
    Skipped(SkipReason),
}

impl ScanOutcome {
    pub fn of(keyword: &Keyword, text: &str) -> Self {
        if keyword.matches(text) {
            ScanOutcome::Match
        } else {
            ScanOutcome::NoMatch
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, ScanOutcome::Match)
    }
}

/// Keeps the records whose outcome is a match, logging the ones that were skipped.
pub fn collect_matches<R>(scanned: impl IntoIterator<Item = (R, ScanOutcome)>, id_of: impl Fn(&R) -> &str) -> Vec<R> {
    let mut found = Vec::new();
    for (record, outcome) in scanned {
        match outcome {
            ScanOutcome::Match => found.push(record),
            ScanOutcome::NoMatch => {}
            ScanOutcome::Skipped(reason) => {
                debug!("Skipping '{}' during search: {}", id_of(&record), reason);
            }
        }
    }
    found
}
