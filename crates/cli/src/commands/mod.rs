//! CLI command implementations.

pub mod buy;
pub mod catalog;
