//! CLOCK extraction.
//!
//! Walks a document tree depth-first and turns every qualifying CLOCK entry
//! into an [`Interval`], inheriting its description and Toggl references
//! from the enclosing headlines.
//!
//! # Rules
//!
//! Headlines with a truthy `TOGGL_IGNORE` are skipped with their whole
//! subtree. A CLOCK then has to pass, in order:
//!
//! 1. status is `closed` (open clocks are pushed once they close)
//! 2. duration is not `0:00` or `0:01` (dropped without counting as skipped)
//! 3. it ended within the retention window
//! 4. some headline above it carries `TOGGL_PID`
//!
//! Headline titles up to and including the one with `TOGGL_PID` form the
//! description, outermost first, leaving out headlines titled `archive`.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::interval::Interval;
use crate::node::{Node, ParseError, Tree};
use crate::types::{ProjectRef, TaskRef};

const HEADLINE: &str = "headline";
const CLOCK: &str = "clock";
const IGNORE_FLAG: &str = "TOGGL_IGNORE";
const PROJECT_KEY: &str = "TOGGL_PID";
const TASK_KEY: &str = "TOGGL_TID";
const ARCHIVE_TITLE: &str = "archive";
const DESCRIPTION_SEPARATOR: &str = " << ";

/// Durations the exporter renders for clocks of a minute or less.
const NEGLIGIBLE_DURATIONS: [&str; 2] = ["0:00", "0:01"];

/// Errors that make the extraction result unreliable.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A property the rules depend on was absent.
    #[error("{kind} node is missing property {key}")]
    MissingProperty { kind: String, key: &'static str },

    /// A property had a type the rules cannot use.
    #[error("{kind} node has invalid {key}: {reason}")]
    InvalidProperty {
        kind: String,
        key: &'static str,
        reason: &'static str,
    },

    /// Timestamp components did not form a real local time.
    #[error("invalid timestamp: {raw}")]
    InvalidTimestamp { raw: String },

    /// The nested timestamp value was not a node.
    #[error("invalid timestamp node: {0}")]
    Parse(#[from] ParseError),
}

/// How many days back CLOCK entries are still considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention(i64);

impl Retention {
    pub const DEFAULT_DAYS: i64 = 30;

    /// Values below one day fall back to [`Retention::DEFAULT_DAYS`].
    pub const fn days(days: i64) -> Self {
        if days < 1 {
            Self(Self::DEFAULT_DAYS)
        } else {
            Self(days)
        }
    }

    pub const fn as_days(self) -> i64 {
        self.0
    }

    fn window(self) -> TimeDelta {
        TimeDelta::try_days(self.0).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Qualifying intervals in traversal order.
    pub intervals: Vec<Interval>,
    /// CLOCK entries rejected as open, too old, untracked, or inconsistent.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Open,
    TooOld,
    NoProject,
    Inconsistent,
}

enum Verdict {
    Accept(Interval),
    Skip(SkipReason),
    Negligible,
}

/// Extracts intervals, localizing timestamps in a fixed zone.
#[derive(Debug, Clone)]
pub struct Extractor<Tz: TimeZone> {
    zone: Tz,
    retention: Retention,
    now: DateTime<FixedOffset>,
}

impl<Tz: TimeZone> Extractor<Tz> {
    /// Creates an extractor, capturing the current time once.
    pub fn new(zone: Tz, retention: Retention) -> Self {
        let now = Utc::now().with_timezone(&zone).fixed_offset();
        Self {
            zone,
            retention,
            now,
        }
    }

    /// Overrides the reference time the retention window counts back from.
    #[must_use]
    pub fn with_now<Z: TimeZone>(mut self, now: DateTime<Z>) -> Self {
        self.now = now.fixed_offset();
        self
    }

    pub const fn retention(&self) -> Retention {
        self.retention
    }

    /// Collects every qualifying CLOCK below `root`.
    pub fn extract(&self, root: Node<'_>) -> Result<Extraction, ExtractError> {
        debug!("searching node for usable CLOCK entries");
        let mut extraction = Extraction::default();
        self.walk(root, &mut extraction)?;
        debug!(
            found = extraction.intervals.len(),
            skipped = extraction.skipped,
            "search done"
        );
        Ok(extraction)
    }

    fn walk(&self, node: Node<'_>, out: &mut Extraction) -> Result<(), ExtractError> {
        for child in node.child_nodes() {
            if child.kind() == HEADLINE && child.property(IGNORE_FLAG).is_some_and(is_truthy) {
                continue;
            }

            if child.has_children() {
                self.walk(child, out)?;
            }

            if child.kind() != CLOCK {
                continue;
            }

            match self.qualify(child)? {
                Verdict::Accept(interval) => out.intervals.push(interval),
                Verdict::Skip(reason) => {
                    trace!(?reason, "skipping CLOCK entry");
                    out.skipped += 1;
                }
                Verdict::Negligible => trace!("dropping CLOCK entry of a minute or less"),
            }
        }
        Ok(())
    }

    fn qualify(&self, clock: Node<'_>) -> Result<Verdict, ExtractError> {
        if require(clock, "status")? != "closed" {
            return Ok(Verdict::Skip(SkipReason::Open));
        }

        let duration = require(clock, "duration")?;
        if duration
            .as_str()
            .is_some_and(|text| NEGLIGIBLE_DURATIONS.contains(&text))
        {
            return Ok(Verdict::Negligible);
        }

        let range = ClockRange::parse(require(clock, "value")?)?;
        let start = self.localize(range.start)?;
        let end = self.localize(range.end)?;

        if self.cutoff().is_some_and(|cutoff| end < cutoff) {
            return Ok(Verdict::Skip(SkipReason::TooOld));
        }

        let lineage = Lineage::collect(clock)?;
        let Some(project) = lineage.project else {
            return Ok(Verdict::Skip(SkipReason::NoProject));
        };

        let description = lineage
            .titles
            .iter()
            .rev()
            .copied()
            .collect::<Vec<_>>()
            .join(DESCRIPTION_SEPARATOR);

        match Interval::new(
            range.label,
            Some(project),
            lineage.task,
            description,
            start,
            end,
        ) {
            Ok(interval) => Ok(Verdict::Accept(interval)),
            Err(err) => {
                warn!(%err, "CLOCK entry duration disagrees with its timestamps");
                Ok(Verdict::Skip(SkipReason::Inconsistent))
            }
        }
    }

    fn cutoff(&self) -> Option<DateTime<FixedOffset>> {
        self.now.checked_sub_signed(self.retention.window())
    }

    /// Attaches the extractor's zone to a wall-clock time.
    ///
    /// Ambiguous times (DST fall-back) resolve to the later, standard-time
    /// instant. Times inside a spring-forward gap are moved forward an hour.
    fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, ExtractError> {
        let local = match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(_, dt) => Some(dt),
            LocalResult::None => naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|shifted| self.zone.from_local_datetime(&shifted).latest()),
        };
        local
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| ExtractError::InvalidTimestamp {
                raw: naive.to_string(),
            })
    }
}

/// Headline context collected while walking up from a CLOCK.
struct Lineage<'a> {
    /// Nearest first.
    titles: Vec<&'a str>,
    project: Option<ProjectRef>,
    task: Option<TaskRef>,
}

impl<'a> Lineage<'a> {
    fn collect(clock: Node<'a>) -> Result<Self, ExtractError> {
        let mut lineage = Self {
            titles: Vec::new(),
            project: None,
            task: None,
        };

        for ancestor in clock.ancestors() {
            if ancestor.kind() != HEADLINE {
                continue;
            }

            let title = require(ancestor, "raw-value")?
                .as_str()
                .ok_or_else(|| invalid(ancestor, "raw-value", "expected a string"))?;
            if title.to_lowercase() != ARCHIVE_TITLE {
                lineage.titles.push(title);
            }

            if lineage.task.is_none() {
                lineage.task = reference(ancestor, TASK_KEY)?.and_then(|t| TaskRef::new(t).ok());
            }

            if ancestor.property(PROJECT_KEY).is_some() {
                // Anything above the project headline belongs to another scope.
                lineage.project =
                    reference(ancestor, PROJECT_KEY)?.and_then(|p| ProjectRef::new(p).ok());
                break;
            }
        }

        Ok(lineage)
    }
}

/// Start and end of a CLOCK's timestamp range.
struct ClockRange {
    label: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ClockRange {
    fn parse(value: &Value) -> Result<Self, ExtractError> {
        let tree = Tree::from_value(value)?;
        let timestamp = tree.root();

        let start = naive_datetime(timestamp, "start")?;
        let end = naive_datetime(timestamp, "end")?;
        let label = timestamp
            .property("raw-value")
            .and_then(Value::as_str)
            .map_or_else(|| format!("{start}--{end}"), str::to_string);

        Ok(Self { label, start, end })
    }
}

fn naive_datetime(timestamp: Node<'_>, side: &'static str) -> Result<NaiveDateTime, ExtractError> {
    let keys: [&'static str; 5] = if side == "start" {
        [
            "year-start",
            "month-start",
            "day-start",
            "hour-start",
            "minute-start",
        ]
    } else {
        ["year-end", "month-end", "day-end", "hour-end", "minute-end"]
    };

    let mut parts = [0_i64; 5];
    for (slot, key) in parts.iter_mut().zip(keys) {
        *slot = require(timestamp, key)?
            .as_i64()
            .ok_or_else(|| invalid(timestamp, key, "expected an integer"))?;
    }
    let [year, month, day, hour, minute] = parts;

    let out_of_range = || ExtractError::InvalidTimestamp {
        raw: format!("{year}-{month}-{day} {hour}:{minute} ({side})"),
    };
    let year = i32::try_from(year).map_err(|_| out_of_range())?;
    let month = u32::try_from(month).map_err(|_| out_of_range())?;
    let day = u32::try_from(day).map_err(|_| out_of_range())?;
    let hour = u32::try_from(hour).map_err(|_| out_of_range())?;
    let minute = u32::try_from(minute).map_err(|_| out_of_range())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(out_of_range)
}

fn require<'a>(node: Node<'a>, key: &'static str) -> Result<&'a Value, ExtractError> {
    node.property(key)
        .ok_or_else(|| ExtractError::MissingProperty {
            kind: node.kind().to_string(),
            key,
        })
}

fn invalid(node: Node<'_>, key: &'static str, reason: &'static str) -> ExtractError {
    ExtractError::InvalidProperty {
        kind: node.kind().to_string(),
        key,
        reason,
    }
}

/// Reads a reference property as text. Unset, `false` and `""` yield `None`.
fn reference(node: Node<'_>, key: &'static str) -> Result<Option<String>, ExtractError> {
    let text = match node.property(key) {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::Bool(true)) => Some("true".to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Array(_) | Value::Object(_)) => {
            return Err(invalid(node, key, "expected a scalar"));
        }
    };
    Ok(text.filter(|text| !text.is_empty()))
}

/// Loose truthiness used by exported property flags.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
