//! Push command for creating Toggl time entries from CLOCK entries.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ot_core::{SyncClient, SyncSummary};
use ot_toggl::TogglClient;

use crate::Config;
use crate::commands::extract;

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Org document exported as JSON.
    pub file: PathBuf,

    /// List what would be pushed without contacting Toggl.
    #[arg(long)]
    pub dry_run: bool,
}

/// Extracts intervals and pushes them one at a time.
///
/// Individual failures are logged and counted; only configuration and
/// document errors abort the run.
pub fn run<W: Write>(writer: &mut W, args: &PushArgs, config: &Config) -> Result<SyncSummary> {
    if args.dry_run {
        let intervals = extract::extract_intervals(&args.file, config)?;
        extract::write_intervals(writer, &intervals)?;
        return Ok(SyncSummary::default());
    }

    let credentials = config.credentials().context("invalid configuration")?;
    let intervals = extract::extract_intervals(&args.file, config)?;

    let client = TogglClient::new(credentials.api_token, credentials.workspace_id)
        .context("failed to create Toggl client")?
        .with_base_url(&config.api_base_url);
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let summary = runtime.block_on(SyncClient::new(client).push_all(&intervals));

    tracing::info!(path = %args.file.display(), "file processed");
    writeln!(
        writer,
        "{} created, {} already present, {} failed",
        summary.created, summary.existing, summary.failed
    )?;
    Ok(summary)
}
