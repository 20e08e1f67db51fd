//! Domain models

pub mod job;
pub mod types;
