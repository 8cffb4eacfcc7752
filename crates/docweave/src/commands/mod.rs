//! Command implementations for the docweave CLI
//!
//! Each command module handles the CLI interface and delegates to
//! docweave-core for the actual work.

pub mod compose;
pub mod generate;
