//! Business services built on top of the API clients.

pub mod oec;
pub mod rosters;
