//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::extract::ExtractArgs;
use crate::commands::push::PushArgs;

/// Push Org-mode CLOCK entries to Toggl Track.
///
/// Reads an Org document exported as JSON, collects closed CLOCK entries
/// under headlines tagged with `TOGGL_PID`, and creates the matching Toggl
/// time entries unless they already exist.
#[derive(Debug, Parser)]
#[command(name = "org-toggl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create Toggl time entries for qualifying CLOCK entries.
    Push(PushArgs),

    /// List the CLOCK entries that would be pushed.
    Extract(ExtractArgs),
}
