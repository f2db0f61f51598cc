//! Candidate time intervals extracted from CLOCK entries.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::Serialize;

use crate::types::{ProjectRef, TaskRef, ValidationError};

/// Project values that mean "tracked, but no concrete project".
const PLACEHOLDER_PROJECTS: [&str; 3] = ["t", "True", "true"];

/// Returns true for `TOGGL_PID` values that only flag a headline as tracked.
pub fn is_placeholder_project(value: &str) -> bool {
    PLACEHOLDER_PROJECTS.contains(&value)
}

/// One closed CLOCK entry ready to be pushed.
///
/// Both timestamps carry the offset of the zone the extractor localized
/// them in, and `end` is always strictly after `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    source_label: String,
    project: Option<ProjectRef>,
    task: Option<TaskRef>,
    description: String,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl Interval {
    pub fn new(
        source_label: impl Into<String>,
        project: Option<ProjectRef>,
        task: Option<TaskRef>,
        description: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::NonPositiveDuration { start, end });
        }
        Ok(Self {
            source_label: source_label.into(),
            project,
            task,
            description: description.into(),
            start,
            end,
        })
    }

    /// The raw timestamp text from the document, used in log lines.
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub const fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref()
    }

    pub const fn task(&self) -> Option<&TaskRef> {
        self.task.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub const fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Range used to look for entries that already cover this interval.
    ///
    /// The end is pulled in by one minute so an entry starting in the same
    /// minute another one ends is not mistaken for a duplicate.
    pub fn overlap_window(&self) -> OverlapWindow {
        OverlapWindow {
            start: self.start,
            end: self.end - TimeDelta::minutes(1),
        }
    }

    /// Builds the payload for creating this interval remotely.
    pub fn to_new_entry(&self) -> NewTimeEntry {
        let project = self
            .project
            .clone()
            .filter(|project| !is_placeholder_project(project.as_str()));
        NewTimeEntry {
            description: self.description.clone(),
            start: self.start,
            stop: self.end,
            duration: self.duration().num_seconds(),
            task: self.task.clone(),
            project,
        }
    }
}

/// Inclusive time range for the remote existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlapWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Fields sent when creating a remote time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTimeEntry {
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
    /// Length in seconds, computed locally from `stop - start`.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 14, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn interval(project: &str) -> Interval {
        Interval::new(
            "[2025-03-14 Fri 10:00]--[2025-03-14 Fri 10:45]",
            Some(ProjectRef::new(project).unwrap()),
            Some(TaskRef::new("77").unwrap()),
            "Work << Deep Focus",
            at(10, 0),
            at(10, 45),
        )
        .unwrap()
    }

    #[test]
    fn rejects_end_not_after_start() {
        let err = Interval::new("x", None, None, "", at(10, 0), at(10, 0)).unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveDuration { .. }));

        assert!(Interval::new("x", None, None, "", at(11, 0), at(10, 0)).is_err());
    }

    #[test]
    fn overlap_window_shrinks_end_by_one_minute() {
        let window = interval("123").overlap_window();
        assert_eq!(window.start, at(10, 0));
        assert_eq!(window.end, at(10, 44));
    }

    #[test]
    fn new_entry_carries_duration_and_refs() {
        let entry = interval("123").to_new_entry();
        assert_eq!(entry.duration, 2700);
        assert_eq!(entry.project.as_ref().map(ProjectRef::as_str), Some("123"));
        assert_eq!(entry.task.as_ref().map(TaskRef::as_str), Some("77"));
        assert_eq!(entry.description, "Work << Deep Focus");
    }

    #[test]
    fn placeholder_projects_are_omitted_from_payload() {
        for placeholder in ["t", "True", "true"] {
            let entry = interval(placeholder).to_new_entry();
            assert!(entry.project.is_none(), "{placeholder} should be omitted");

            let json = serde_json::to_value(&entry).unwrap();
            assert!(json.get("project").is_none());
        }
        assert!(!is_placeholder_project("TRUE1"));
    }

    #[test]
    fn payload_serializes_offsets() {
        let json = serde_json::to_value(interval("123").to_new_entry()).unwrap();
        assert_eq!(json["start"], "2025-03-14T10:00:00+02:00");
        assert_eq!(json["stop"], "2025-03-14T10:45:00+02:00");
        assert_eq!(json["task"], "77");
    }
}
