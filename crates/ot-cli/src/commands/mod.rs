//! CLI subcommand implementations.

pub mod extract;
pub mod push;
