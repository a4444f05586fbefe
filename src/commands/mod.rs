//! CLI command implementations

pub mod monitor;
pub mod plan;
