//! Service layer

pub mod file;
pub mod patch;
pub mod process;
