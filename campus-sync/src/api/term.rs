//! Term and SIS section identifier parsing.
//!
//! An LMS section is backed by an official registrar section iff its SIS
//! identifier parses as `SEC:<year>-<term letter>-<ccn>`. Sections whose
//! identifier is missing or does not parse are treated as LMS-only.

use once_cell::sync::Lazy;
use regex::Regex;

static SIS_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SEC:(\d{4})-([A-D])-(\d+)$").expect("valid regex"));

static TERM_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-[A-D]$").expect("valid regex"));

/// A parsed SIS section identifier: term parts plus the registrar's
/// course-control-number for the section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SisSectionId {
    pub year: String,
    pub term_letter: char,
    pub ccn: String,
}

impl SisSectionId {
    /// Parse a raw SIS identifier. Returns `None` for anything that is not
    /// a recognized `SEC:<year>-<letter>-<ccn>` value.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = SIS_SECTION_RE.captures(raw)?;
        Some(Self {
            year: caps[1].to_string(),
            term_letter: caps[2].chars().next()?,
            ccn: caps[3].to_string(),
        })
    }
}

/// Check whether a string has the `<year>-<letter>` term code shape used
/// for term workspace folder titles (e.g. `2015-D`).
pub fn is_term_code(value: &str) -> bool {
    TERM_CODE_RE.is_match(value)
}
