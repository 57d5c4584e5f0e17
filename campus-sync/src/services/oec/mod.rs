//! Course-evaluation (OEC) tooling: diff reports between expected and
//! confirmed course datasets, and term workspace provisioning.

pub mod diff;
pub mod rows;
pub mod term_setup;

pub use diff::{CoursesDiff, DiffOutcome};
pub use rows::CourseRow;
pub use term_setup::TermSetupTask;
