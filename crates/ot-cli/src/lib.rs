//! org-toggl CLI library.
//!
//! This crate provides the CLI interface: configuration, document loading,
//! and the `push` and `extract` subcommands.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{Config, Credentials};
