//! Infrastructure layer

pub mod job_registry;
pub mod output_buffer;
