//! CLI command implementations

pub mod assignments;
pub mod roles;
pub mod sync;
