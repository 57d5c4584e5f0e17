//! Merged roster output shapes.

use std::collections::BTreeSet;

use serde::Serialize;

/// A course section as surfaced in the roster feed. `ccn` is present iff
/// the section's SIS identifier parsed into a recognized term format.
#[derive(Debug, Clone, Serialize)]
pub struct RosterSection {
    pub id: u64,
    pub name: String,
    pub sis_section_id: Option<String>,
    pub ccn: Option<String>,
}

/// One student in the merged roster.
///
/// A student appears here iff at least one of their section enrollments
/// resolved to Enrolled status in a linked section. `sections` and
/// `section_ccns` list only those Enrolled sections; waitlisted sections
/// of the same student are excluded. Registrar-supplied fields follow a
/// first-match-wins rule: once set from one section's registrar row they
/// are never overwritten by a later match.
///
/// Photo bytes are deliberately not stored on this record: they are
/// resolved on demand through the roster service's photo lookup, so a
/// disqualified student never triggers a registrar fetch.
#[derive(Debug, Clone, Serialize)]
pub struct MergedStudent {
    pub id: u64,
    pub login_id: String,
    pub student_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub sections: Vec<RosterSection>,
    pub section_ccns: BTreeSet<String>,
}

/// The full reconciled roster for one course.
#[derive(Debug, Clone, Serialize)]
pub struct RosterFeed {
    pub course_id: u64,
    pub sections: Vec<RosterSection>,
    pub students: Vec<MergedStudent>,
}
