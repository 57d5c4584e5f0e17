//! Course roster reconciliation.
//!
//! Pulls section and enrollment data from the LMS, cross-references each
//! linked section against the registrar, and produces one merged roster of
//! officially enrolled students. Also hosts the photo resolution policy,
//! which gates per-student photo fetches on reconciled enrollment status.

pub mod merge;
pub mod models;

use std::collections::HashSet;

use tokio::sync::OnceCell;

pub use models::{MergedStudent, RosterFeed, RosterSection};

use crate::api::lms::LmsApi;
use crate::api::models::StudentPhoto;
use crate::api::registrar::RegistrarApi;
use crate::api::term::SisSectionId;
use crate::error::{Result, SyncError};
use merge::RegistrarIndex;

/// A reconciled roster plus the waitlist facts the photo policy needs.
pub struct ReconciledRoster {
    pub feed: RosterFeed,
    waitlisted: HashSet<u64>,
}

impl ReconciledRoster {
    pub fn student(&self, canvas_id: u64) -> Option<&MergedStudent> {
        self.feed.students.iter().find(|s| s.id == canvas_id)
    }

    /// Officially fully enrolled: present in the roster and not Waitlisted
    /// in any linked section.
    pub fn is_fully_enrolled(&self, canvas_id: u64) -> bool {
        self.student(canvas_id).is_some() && !self.waitlisted.contains(&canvas_id)
    }
}

/// Roster reconciliation and photo policy for one course, one run.
pub struct RosterService<L, R> {
    lms: L,
    registrar: R,
    course_id: u64,
    teacher_login_id: String,
    roster: OnceCell<ReconciledRoster>,
}

impl<L: LmsApi, R: RegistrarApi> RosterService<L, R> {
    pub fn new(lms: L, registrar: R, course_id: u64, teacher_login_id: &str) -> Self {
        Self {
            lms,
            registrar,
            course_id,
            teacher_login_id: teacher_login_id.to_string(),
            roster: OnceCell::new(),
        }
    }

    /// The merged roster feed. Reconciliation runs once per service
    /// instance; repeated calls return the same snapshot.
    pub async fn get_feed(&self) -> Result<&RosterFeed> {
        Ok(&self.roster().await?.feed)
    }

    /// Photo bytes for a student, or `None` if the student is not in the
    /// merged roster or is Waitlisted in any linked section. Never fetches
    /// for disqualified ids.
    pub async fn photo_data(&self, canvas_id: u64) -> Result<Option<StudentPhoto>> {
        let roster = self.roster().await?;
        if !roster.is_fully_enrolled(canvas_id) {
            return Ok(None);
        }
        match roster.student(canvas_id) {
            Some(student) => self.registrar.photo(&student.login_id).await,
            None => Ok(None),
        }
    }

    async fn roster(&self) -> Result<&ReconciledRoster> {
        self.roster
            .get_or_try_init(|| self.reconcile())
            .await
    }

    async fn reconcile(&self) -> Result<ReconciledRoster> {
        let teachers = self.lms.teachers_list(self.course_id).await?;
        if !teachers
            .iter()
            .any(|t| t.login_id == self.teacher_login_id)
        {
            return Err(SyncError::NotFound(format!(
                "teacher '{}' not found in course {}",
                self.teacher_login_id, self.course_id
            )));
        }

        let sections = self.lms.sections_list(self.course_id).await?;
        let students = self.lms.students_list(self.course_id).await?;

        let mut registrar_index = RegistrarIndex::new();
        for section in &sections {
            let Some(sis) = section.sis_section_id.as_deref().and_then(SisSectionId::parse)
            else {
                continue;
            };
            let rows = self
                .registrar
                .enrolled_students(&sis.ccn, &sis.year, sis.term_letter)
                .await?;
            log::debug!("Registrar returned {} rows for ccn {}", rows.len(), sis.ccn);
            registrar_index.insert(
                sis.ccn,
                rows.into_iter().map(|r| (r.login_id.clone(), r)).collect(),
            );
        }

        let outcome = merge::merge_rosters(&sections, &students, &registrar_index);
        log::info!(
            "Reconciled course {}: {} sections, {} officially enrolled students",
            self.course_id,
            sections.len(),
            outcome.students.len()
        );

        Ok(ReconciledRoster {
            feed: RosterFeed {
                course_id: self.course_id,
                sections: merge::roster_sections(&sections),
                students: outcome.students,
            },
            waitlisted: outcome.waitlisted_anywhere,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::api::models::{
        CanvasEnrollment, CanvasSection, CanvasStudent, CanvasTeacher, EnrollStatus,
        RegistrarEnrollment, STUDENT_ROLE,
    };

    struct FakeLms {
        sections: Vec<CanvasSection>,
        students: Vec<CanvasStudent>,
        teachers: Vec<CanvasTeacher>,
    }

    #[async_trait]
    impl LmsApi for FakeLms {
        async fn sections_list(&self, _course_id: u64) -> Result<Vec<CanvasSection>> {
            Ok(self.sections.clone())
        }
        async fn students_list(&self, _course_id: u64) -> Result<Vec<CanvasStudent>> {
            Ok(self.students.clone())
        }
        async fn teachers_list(&self, _course_id: u64) -> Result<Vec<CanvasTeacher>> {
            Ok(self.teachers.clone())
        }
    }

    struct FakeRegistrar {
        rows_by_ccn: HashMap<String, Vec<RegistrarEnrollment>>,
        photos: HashMap<String, Vec<u8>>,
        photo_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegistrarApi for FakeRegistrar {
        async fn enrolled_students(
            &self,
            ccn: &str,
            _year: &str,
            _term_letter: char,
        ) -> Result<Vec<RegistrarEnrollment>> {
            Ok(self.rows_by_ccn.get(ccn).cloned().unwrap_or_default())
        }

        async fn photo(&self, login_id: &str) -> Result<Option<StudentPhoto>> {
            self.photo_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.photos.get(login_id).map(|data| StudentPhoto {
                size: data.len() as u64,
                data: data.clone(),
            }))
        }
    }

    /// Registrar whose connection is down: every call fails.
    struct DownRegistrar;

    #[async_trait]
    impl RegistrarApi for DownRegistrar {
        async fn enrolled_students(
            &self,
            _ccn: &str,
            _year: &str,
            _term_letter: char,
        ) -> Result<Vec<RegistrarEnrollment>> {
            Err(SyncError::UpstreamUnavailable("connection refused".to_string()))
        }

        async fn photo(&self, _login_id: &str) -> Result<Option<StudentPhoto>> {
            Err(SyncError::UpstreamUnavailable("connection refused".to_string()))
        }
    }

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

    fn registrar_row(login_id: &str, status: EnrollStatus) -> RegistrarEnrollment {
        RegistrarEnrollment {
            login_id: login_id.to_string(),
            status,
            student_id: format!("sid-{}", login_id),
            first_name: Some("Clarence".to_string()),
            last_name: Some(format!("Williams {}", login_id)),
            email: Some(format!("{}@example.edu", login_id)),
        }
    }

    fn teacher(login_id: &str) -> CanvasTeacher {
        CanvasTeacher {
            id: 777,
            login_id: login_id.to_string(),
        }
    }

    fn service(
        sections: Vec<CanvasSection>,
        students: Vec<CanvasStudent>,
        rows_by_ccn: HashMap<String, Vec<RegistrarEnrollment>>,
        photos: HashMap<String, Vec<u8>>,
    ) -> (RosterService<FakeLms, FakeRegistrar>, Arc<AtomicUsize>) {
        let photo_calls = Arc::new(AtomicUsize::new(0));
        let lms = FakeLms {
            sections,
            students,
            teachers: vec![teacher("teach")],
        };
        let registrar = FakeRegistrar {
            rows_by_ccn,
            photos,
            photo_calls: photo_calls.clone(),
        };
        (RosterService::new(lms, registrar, 4242, "teach"), photo_calls)
    }

    #[tokio::test]
    async fn test_feed_lists_only_registrar_confirmed_students() {
        let (svc, _) = service(
            vec![
                section(10, "An Official Section", Some("SEC:2013-C-123")),
                section(11, "An Unofficial Section", None),
            ],
            vec![student(1, "1001", &[11, 10]), student(2, "1002", &[10])],
            HashMap::from([(
                "123".to_string(),
                vec![
                    registrar_row("1001", EnrollStatus::Enrolled),
                    registrar_row("1099", EnrollStatus::Enrolled),
                ],
            )]),
            HashMap::new(),
        );

        let feed = svc.get_feed().await.unwrap();
        assert_eq!(feed.course_id, 4242);
        assert_eq!(feed.sections.len(), 2);
        assert_eq!(feed.sections[0].ccn.as_deref(), Some("123"));
        assert!(feed.sections[1].ccn.is_none());
        assert_eq!(feed.students.len(), 1);
        assert_eq!(feed.students[0].id, 1);
        assert_eq!(feed.students[0].sections.len(), 1);
    }

    #[tokio::test]
    async fn test_unlinked_course_yields_empty_roster() {
        let (svc, _) = service(
            vec![section(30, "not-an-official-section", None)],
            vec![student(1, "1001", &[30])],
            HashMap::new(),
            HashMap::new(),
        );

        let feed = svc.get_feed().await.unwrap();
        assert_eq!(feed.sections.len(), 1);
        assert!(feed.sections[0].sis_section_id.is_none());
        assert!(feed.students.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_teacher_is_not_found() {
        let lms = FakeLms {
            sections: vec![],
            students: vec![],
            teachers: vec![teacher("someone-else")],
        };
        let registrar = FakeRegistrar {
            rows_by_ccn: HashMap::new(),
            photos: HashMap::new(),
            photo_calls: Arc::new(AtomicUsize::new(0)),
        };
        let svc = RosterService::new(lms, registrar, 4242, "teach");

        let err = svc.get_feed().await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_registrar_outage_propagates_upstream_unavailable() {
        let lms = FakeLms {
            sections: vec![section(10, "An Official Section", Some("SEC:2013-C-123"))],
            students: vec![student(1, "1001", &[10])],
            teachers: vec![teacher("teach")],
        };
        let svc = RosterService::new(lms, DownRegistrar, 4242, "teach");

        let err = svc.get_feed().await.unwrap_err();
        assert!(matches!(err, SyncError::UpstreamUnavailable(_)));
        // A failed reconciliation leaves nothing cached behind: the next
        // call hits the registrar again instead of serving a partial feed.
        let err = svc.get_feed().await.unwrap_err();
        assert!(matches!(err, SyncError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_partially_waitlisted_student_keeps_only_enrolled_ccn() {
        let (svc, calls) = service(
            vec![
                section(20, "Section A", Some("SEC:2013-C-001")),
                section(21, "Section B", Some("SEC:2013-C-002")),
            ],
            vec![student(5, "1005", &[20, 21])],
            HashMap::from([
                ("001".to_string(), vec![registrar_row("1005", EnrollStatus::Enrolled)]),
                ("002".to_string(), vec![registrar_row("1005", EnrollStatus::Waitlisted)]),
            ]),
            HashMap::from([("1005".to_string(), vec![1, 2, 3])]),
        );

        let feed = svc.get_feed().await.unwrap();
        assert_eq!(feed.students.len(), 1);
        let ccns: Vec<&str> = feed.students[0]
            .section_ccns
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(ccns, vec!["001"]);

        // Waitlisted in one section disqualifies the photo fetch entirely.
        let photo = svc.photo_data(5).await.unwrap();
        assert!(photo.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_photo_fetched_once_for_fully_enrolled_student_only() {
        let (svc, calls) = service(
            vec![section(40, "An Official Section", Some("SEC:2013-C-400"))],
            vec![
                student(1, "1001", &[40]),
                student(2, "1002", &[40]),
                student(3, "1003", &[40]),
            ],
            HashMap::from([(
                "400".to_string(),
                vec![
                    registrar_row("1001", EnrollStatus::Enrolled),
                    registrar_row("1002", EnrollStatus::Waitlisted),
                ],
            )]),
            HashMap::from([("1001".to_string(), vec![0xff; 42])]),
        );

        let enrolled = svc.photo_data(1).await.unwrap().unwrap();
        assert_eq!(enrolled.size, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Waitlisted-everywhere student: not in roster, no fetch.
        assert!(svc.photo_data(2).await.unwrap().is_none());
        // Student unknown to the registrar: not in roster, no fetch.
        assert!(svc.photo_data(3).await.unwrap().is_none());
        // Id that is not in the course at all.
        assert!(svc.photo_data(999).await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
