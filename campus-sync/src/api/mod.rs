//! Typed clients for the external collaborators: the campus LMS, the
//! registrar data service and the remote drive store.
//!
//! Each backend is reached through a trait so the services can run against
//! in-memory fakes in tests.

pub mod drive;
pub mod lms;
pub mod models;
pub mod registrar;
pub mod term;

pub use drive::{DriveClient, RemoteStore};
pub use lms::{CanvasClient, LmsApi};
pub use models::{
    CanvasEnrollment, CanvasSection, CanvasStudent, CanvasTeacher, EnrollStatus,
    RegistrarEnrollment, RemoteItem, StudentPhoto,
};
pub use registrar::{RegistrarApi, RegistrarClient};
pub use term::SisSectionId;
