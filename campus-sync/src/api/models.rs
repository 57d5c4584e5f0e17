//! Wire-shape records for the LMS, registrar and remote store backends.
//!
//! String-keyed payloads are decoded into these typed records at the client
//! boundary; business logic never sees raw JSON.

use serde::{Deserialize, Serialize};

/// Role tag the LMS uses for student enrollments.
pub const STUDENT_ROLE: &str = "StudentEnrollment";

/// An LMS course section. `sis_section_id` is present iff the section was
/// provisioned from the registrar; LMS-only sections carry none.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CanvasSection {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub sis_section_id: Option<String>,
}

/// One enrollment entry as reported by the LMS.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasEnrollment {
    pub course_section_id: u64,
    pub role: String,
    pub enrollment_state: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CanvasEnrollment {
    /// Whether this entry is an active student-role enrollment.
    pub fn is_active_student(&self) -> bool {
        self.role == STUDENT_ROLE && self.enrollment_state == "active"
    }
}

/// A student as reported by the LMS, with all of their section enrollments.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasStudent {
    pub id: u64,
    pub login_id: String,
    #[serde(default)]
    pub enrollments: Vec<CanvasEnrollment>,
}

/// A teacher as reported by the LMS.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasTeacher {
    pub id: u64,
    pub login_id: String,
}

/// Official enrollment status from the registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollStatus {
    Enrolled,
    Waitlisted,
}

impl EnrollStatus {
    /// Decode the registrar's single-letter status code. Unknown codes map
    /// to `None` and are dropped at the adapter boundary.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(EnrollStatus::Enrolled),
            "W" => Some(EnrollStatus::Waitlisted),
            _ => None,
        }
    }
}

/// Raw registrar enrollment row as returned by the campus data service.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarRowWire {
    pub ldap_uid: String,
    pub enroll_status: String,
    pub student_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub student_email_address: Option<String>,
}

/// A validated registrar enrollment record for one student in one section.
#[derive(Debug, Clone)]
pub struct RegistrarEnrollment {
    pub login_id: String,
    pub status: EnrollStatus,
    pub student_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl RegistrarEnrollment {
    /// Validate a wire row. Rows with an unrecognized status code are not
    /// representable and yield `None`.
    pub fn from_wire(wire: RegistrarRowWire) -> Option<Self> {
        let status = EnrollStatus::from_code(&wire.enroll_status)?;
        Some(Self {
            login_id: wire.ldap_uid,
            status,
            student_id: wire.student_id,
            first_name: wire.first_name,
            last_name: wire.last_name,
            email: wire.student_email_address,
        })
    }
}

/// Photo bytes for one student.
#[derive(Debug, Clone)]
pub struct StudentPhoto {
    pub data: Vec<u8>,
    pub size: u64,
}

/// A folder or file node in the remote drive store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteItem {
    pub id: String,
    pub title: String,
}
