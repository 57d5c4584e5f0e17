//! Pure reconciliation core: merges LMS enrollment with registrar
//! enrollment status into one roster.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::models::{MergedStudent, RosterSection};
use crate::api::models::{CanvasSection, CanvasStudent, EnrollStatus, RegistrarEnrollment};
use crate::api::term::SisSectionId;

/// Registrar rows indexed by ccn, then by login id.
pub type RegistrarIndex = HashMap<String, HashMap<String, RegistrarEnrollment>>;

/// Result of one merge pass.
pub struct MergeOutcome {
    /// Students with at least one Enrolled linked-section enrollment,
    /// sorted by LMS id.
    pub students: Vec<MergedStudent>,
    /// LMS ids of students whose registrar status in at least one linked
    /// section is Waitlisted. Feeds the photo resolution policy.
    pub waitlisted_anywhere: HashSet<u64>,
}

/// Convert LMS sections to feed sections, attaching the ccn for every
/// section whose SIS identifier parses.
pub fn roster_sections(sections: &[CanvasSection]) -> Vec<RosterSection> {
    sections
        .iter()
        .map(|section| {
            let ccn = section
                .sis_section_id
                .as_deref()
                .and_then(SisSectionId::parse)
                .map(|sis| sis.ccn);
            RosterSection {
                id: section.id,
                name: section.name.clone(),
                sis_section_id: section.sis_section_id.clone(),
                ccn,
            }
        })
        .collect()
}

/// Merge LMS-side students with the registrar index.
///
/// A student qualifies for the output iff they hold an active student-role
/// enrollment in a linked section where the registrar reports them as
/// Enrolled. Waitlisted and unofficial enrollments never surface a student
/// on their own, and waitlisted sections are excluded from the merged
/// section lists of students who qualify via another section.
pub fn merge_rosters(
    sections: &[CanvasSection],
    students: &[CanvasStudent],
    registrar: &RegistrarIndex,
) -> MergeOutcome {
    let feed_sections = roster_sections(sections);
    let sections_by_id: HashMap<u64, &RosterSection> =
        feed_sections.iter().map(|s| (s.id, s)).collect();

    let mut merged: HashMap<u64, MergedStudent> = HashMap::new();
    let mut waitlisted_anywhere: HashSet<u64> = HashSet::new();

    for student in students {
        for enrollment in &student.enrollments {
            if !enrollment.is_active_student() {
                continue;
            }
            let Some(section) = sections_by_id.get(&enrollment.course_section_id) else {
                continue;
            };
            let Some(ccn) = section.ccn.as_deref() else {
                // LMS-only section, no registrar backing.
                continue;
            };
            let Some(row) = registrar
                .get(ccn)
                .and_then(|by_login| by_login.get(&student.login_id))
            else {
                log::debug!(
                    "Student {} not in registrar rows for ccn {}",
                    student.login_id,
                    ccn
                );
                continue;
            };

            match row.status {
                EnrollStatus::Waitlisted => {
                    waitlisted_anywhere.insert(student.id);
                }
                EnrollStatus::Enrolled => {
                    let entry = merged.entry(student.id).or_insert_with(|| MergedStudent {
                        id: student.id,
                        login_id: student.login_id.clone(),
                        student_id: None,
                        first_name: None,
                        last_name: None,
                        email: None,
                        profile_url: student
                            .enrollments
                            .iter()
                            .find_map(|e| e.html_url.clone()),
                        sections: Vec::new(),
                        section_ccns: BTreeSet::new(),
                    });
                    // First match wins for registrar-supplied fields.
                    if entry.student_id.is_none() {
                        entry.student_id = Some(row.student_id.clone());
                    }
                    if entry.first_name.is_none() {
                        entry.first_name = row.first_name.clone();
                    }
                    if entry.last_name.is_none() {
                        entry.last_name = row.last_name.clone();
                    }
                    if entry.email.is_none() {
                        entry.email = row.email.clone();
                    }
                    if entry.section_ccns.insert(ccn.to_string()) {
                        entry.sections.push((*section).clone());
                    }
                }
            }
        }
    }

    let mut students: Vec<MergedStudent> = merged.into_values().collect();
    students.sort_by_key(|s| s.id);

    MergeOutcome {
        students,
        waitlisted_anywhere,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CanvasEnrollment, STUDENT_ROLE};

    fn section(id: u64, name: &str, sis_id: Option<&str>) -> CanvasSection {
        CanvasSection {
            id,
            name: name.to_string(),
            sis_section_id: sis_id.map(str::to_string),
        }
    }

    fn student(id: u64, login_id: &str, section_ids: &[u64]) -> CanvasStudent {
        CanvasStudent {
            id,
            login_id: login_id.to_string(),
            enrollments: section_ids
                .iter()
                .map(|&section_id| CanvasEnrollment {
                    course_section_id: section_id,
                    role: STUDENT_ROLE.to_string(),
                    enrollment_state: "active".to_string(),
                    html_url: Some(format!("https://lms.example.edu/users/{}", id)),
                })
                .collect(),
        }
    }

    fn registrar_row(login_id: &str, status: EnrollStatus, student_id: &str) -> RegistrarEnrollment {
        RegistrarEnrollment {
            login_id: login_id.to_string(),
            status,
            student_id: student_id.to_string(),
            first_name: Some("Thurston".to_string()),
            last_name: Some(format!("Howell {}", login_id)),
            email: Some(format!("{}@example.edu", login_id)),
        }
    }

    fn index(entries: &[(&str, RegistrarEnrollment)]) -> RegistrarIndex {
        let mut index = RegistrarIndex::new();
        for (ccn, row) in entries {
            index
                .entry(ccn.to_string())
                .or_default()
                .insert(row.login_id.clone(), row.clone());
        }
        index
    }

    #[test]
    fn test_only_registrar_confirmed_students_surface() {
        let sections = vec![
            section(10, "An Official Section", Some("SEC:2013-C-123")),
            section(11, "An Unofficial Section", None),
        ];
        let students = vec![student(1, "1001", &[11, 10]), student(2, "1002", &[10])];
        let registrar = index(&[("123", registrar_row("1001", EnrollStatus::Enrolled, "9001"))]);

        let outcome = merge_rosters(&sections, &students, &registrar);

        assert_eq!(outcome.students.len(), 1);
        let merged = &outcome.students[0];
        assert_eq!(merged.id, 1);
        assert_eq!(merged.student_id.as_deref(), Some("9001"));
        assert!(merged.first_name.is_some());
        assert!(merged.email.is_some());
        assert_eq!(merged.sections.len(), 1);
        assert_eq!(merged.section_ccns.len(), 1);
        assert!(merged.profile_url.is_some());
    }

    #[test]
    fn test_waitlisted_section_excluded_from_merged_lists() {
        let sections = vec![
            section(20, "Section A", Some("SEC:2013-C-001")),
            section(21, "Section B", Some("SEC:2013-C-002")),
        ];
        let students = vec![student(5, "1005", &[20, 21])];
        let registrar = index(&[
            ("001", registrar_row("1005", EnrollStatus::Enrolled, "9005")),
            ("002", registrar_row("1005", EnrollStatus::Waitlisted, "9005")),
        ]);

        let outcome = merge_rosters(&sections, &students, &registrar);

        assert_eq!(outcome.students.len(), 1);
        let ccns: Vec<&str> = outcome.students[0]
            .section_ccns
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(ccns, vec!["001"]);
        assert!(outcome.waitlisted_anywhere.contains(&5));
    }

    #[test]
    fn test_waitlisted_everywhere_student_is_absent() {
        let sections = vec![section(30, "Section A", Some("SEC:2013-C-300"))];
        let students = vec![student(7, "1007", &[30])];
        let registrar = index(&[("300", registrar_row("1007", EnrollStatus::Waitlisted, "9007"))]);

        let outcome = merge_rosters(&sections, &students, &registrar);

        assert!(outcome.students.is_empty());
        assert!(outcome.waitlisted_anywhere.contains(&7));
    }

    #[test]
    fn test_unofficial_only_student_is_absent() {
        let sections = vec![section(40, "not-an-official-section", None)];
        let students = vec![student(9, "1009", &[40])];

        let outcome = merge_rosters(&sections, &students, &RegistrarIndex::new());

        assert!(outcome.students.is_empty());
        assert!(outcome.waitlisted_anywhere.is_empty());
    }

    #[test]
    fn test_first_registrar_match_wins_for_fields() {
        let sections = vec![
            section(50, "Section A", Some("SEC:2013-C-501")),
            section(51, "Section B", Some("SEC:2013-C-502")),
        ];
        let students = vec![student(3, "1003", &[50, 51])];
        let mut second = registrar_row("1003", EnrollStatus::Enrolled, "other-id");
        second.first_name = Some("Different".to_string());
        let registrar = index(&[
            ("501", registrar_row("1003", EnrollStatus::Enrolled, "9003")),
            ("502", second),
        ]);

        let outcome = merge_rosters(&sections, &students, &registrar);

        let merged = &outcome.students[0];
        assert_eq!(merged.student_id.as_deref(), Some("9003"));
        assert_eq!(merged.first_name.as_deref(), Some("Thurston"));
        assert_eq!(merged.sections.len(), 2);
    }

    #[test]
    fn test_output_sorted_by_lms_id() {
        let sections = vec![section(60, "Section A", Some("SEC:2013-C-600"))];
        let students = vec![
            student(42, "1042", &[60]),
            student(7, "1070", &[60]),
            student(19, "1019", &[60]),
        ];
        let registrar = index(&[
            ("600", registrar_row("1042", EnrollStatus::Enrolled, "a")),
            ("600", registrar_row("1070", EnrollStatus::Enrolled, "b")),
            ("600", registrar_row("1019", EnrollStatus::Enrolled, "c")),
        ]);

        let outcome = merge_rosters(&sections, &students, &registrar);

        let ids: Vec<u64> = outcome.students.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![7, 19, 42]);
    }
}
