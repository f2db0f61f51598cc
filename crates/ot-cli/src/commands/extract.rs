//! Extract command for listing the CLOCK entries a push would send.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use ot_core::{Extractor, Interval, Tree};

use crate::Config;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Org document exported as JSON.
    pub file: PathBuf,

    /// Print intervals as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ExtractArgs, config: &Config) -> Result<usize> {
    let intervals = extract_intervals(&args.file, config)?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&intervals)?)?;
    } else {
        write_intervals(writer, &intervals)?;
    }
    Ok(intervals.len())
}

/// Loads the document at `path` and extracts its qualifying intervals.
///
/// Timestamps are read as local time in the system zone.
pub fn extract_intervals(path: &Path, config: &Config) -> Result<Vec<Interval>> {
    let tree = load_document(path)?;

    // Localization uses `Local`; the IANA name is only logged.
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    let offset = *Local::now().offset();
    tracing::debug!(
        %timezone,
        %offset,
        retention_days = config.retention().as_days(),
        "extracting"
    );

    let extraction = Extractor::new(Local, config.retention())
        .extract(tree.root())
        .with_context(|| format!("failed to extract CLOCK entries from {}", path.display()))?;
    Ok(extraction.intervals)
}

fn load_document(path: &Path) -> Result<Tree> {
    tracing::info!(path = %path.display(), "processing org JSON file");
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Tree::from_json_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes one line per interval: start, end, project[/task], description.
pub fn write_intervals<W: Write>(writer: &mut W, intervals: &[Interval]) -> Result<()> {
    if intervals.is_empty() {
        writeln!(writer, "No CLOCK entries to push.")?;
        return Ok(());
    }

    for interval in intervals {
        let project = interval.project().map_or("-", |p| p.as_str());
        let refs = interval
            .task()
            .map_or_else(|| project.to_string(), |task| format!("{project}/{task}"));
        writeln!(
            writer,
            "{}  {}  {}  {}",
            interval.start().format(TIME_FORMAT),
            interval.end().format(TIME_FORMAT),
            refs,
            interval.description()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, FixedOffset, TimeZone};
    use insta::assert_snapshot;
    use ot_core::{ProjectRef, TaskRef};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    #[test]
    fn write_intervals_lists_refs_and_descriptions() {
        let intervals = vec![
            Interval::new(
                "[a]",
                Some(ProjectRef::new("123").unwrap()),
                None,
                "Work << Deep Focus",
                at(6, 10, 0),
                at(6, 10, 45),
            )
            .unwrap(),
            Interval::new(
                "[b]",
                Some(ProjectRef::new("55").unwrap()),
                Some(TaskRef::new("9").unwrap()),
                "Client A << Bugfix",
                at(7, 23, 30),
                at(8, 0, 15),
            )
            .unwrap(),
        ];

        let mut output = Vec::new();
        write_intervals(&mut output, &intervals).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        2025-01-06 10:00  2025-01-06 10:45  123  Work << Deep Focus
        2025-01-07 23:30  2025-01-08 00:15  55/9  Client A << Bugfix
        ");
    }

    #[test]
    fn write_intervals_reports_empty_result() {
        let mut output = Vec::new();
        write_intervals(&mut output, &[]).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No CLOCK entries to push.\n");
    }

    #[test]
    fn load_document_reports_malformed_json() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.json");
        fs::write(&path, r#"{"not": "a node"}"#).unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(format!("{err:#}").contains("malformed node"));
    }
}
