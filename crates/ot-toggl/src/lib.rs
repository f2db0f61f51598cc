//! Toggl Track integration for org-toggl.
//!
//! Implements [`TimeEntryApi`] over the Toggl Track v9 REST API:
//! - listing the current user's time entries in a range
//! - creating a time entry in the configured workspace

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use ot_core::{NewTimeEntry, OverlapWindow, ProjectRef, TaskRef, TimeEntryApi};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Root of the Toggl Track v9 API.
pub const DEFAULT_BASE_URL: &str = "https://api.track.toggl.com/api/v9";
/// Provenance tag Toggl stores on every created entry.
const CREATED_WITH: &str = "org-toggl";

/// Toggl client errors.
#[derive(Debug, Error)]
pub enum TogglError {
    /// The provided API token was invalid.
    #[error("invalid API token: {reason}")]
    InvalidApiToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Toggl answered with a non-success status.
    #[error("Toggl API error {status}: {message}")]
    Api { status: u16, message: String },
    /// A project or task reference was not a Toggl id.
    #[error("{field} must be a numeric Toggl id, got {value:?}")]
    InvalidReference { field: &'static str, value: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Toggl Track API client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct TogglClient {
    http: reqwest::Client,
    api_token: String,
    workspace_id: u64,
    base_url: String,
}

impl fmt::Debug for TogglClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TogglClient")
            .field("api_token", &"[REDACTED]")
            .field("workspace_id", &self.workspace_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TogglClient {
    /// Creates a new client for one workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the API token is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_token: impl Into<String>, workspace_id: u64) -> Result<Self, TogglError> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(TogglError::InvalidApiToken {
                reason: "API token cannot be empty",
            });
        }
        if api_token.trim().is_empty() {
            return Err(TogglError::InvalidApiToken {
                reason: "API token cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(TogglError::ClientBuild)?;

        Ok(Self {
            http,
            api_token,
            workspace_id,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub const fn workspace_id(&self) -> u64 {
        self.workspace_id
    }

    /// Fetches the user's entries between `start` and `end`.
    pub async fn fetch_time_entries(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeEntry>, TogglError> {
        let url = format!("{}/me/time_entries", self.base_url);
        let query = [("start_date", iso8601(start)), ("end_date", iso8601(end))];
        debug!(%url, ?query, "sending GET request");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_token, Some("api_token"))
            .query(&query)
            .send()
            .await?;

        let entries: Option<Vec<TimeEntry>> = read_response(response).await?;
        Ok(entries.unwrap_or_default())
    }

    /// Creates an entry in the client's workspace.
    pub async fn post_time_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, TogglError> {
        let body = CreateTimeEntry {
            description: &entry.description,
            start: iso8601(entry.start),
            stop: iso8601(entry.stop),
            duration: entry.duration,
            workspace_id: self.workspace_id,
            created_with: CREATED_WITH,
            project_id: parse_id("project", entry.project.as_ref().map(ProjectRef::as_str))?,
            task_id: parse_id("task", entry.task.as_ref().map(TaskRef::as_str))?,
        };

        let url = format!("{}/workspaces/{}/time_entries", self.base_url, self.workspace_id);
        debug!(%url, "sending POST request");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.api_token, Some("api_token"))
            .json(&body)
            .send()
            .await?;

        read_response(response).await
    }
}

impl TimeEntryApi for TogglClient {
    type Record = TimeEntry;
    type Error = TogglError;

    async fn list_time_entries(&self, window: &OverlapWindow) -> Result<Vec<TimeEntry>, TogglError> {
        self.fetch_time_entries(window.start, window.end).await
    }

    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, TogglError> {
        self.post_time_entry(entry).await
    }
}

/// A time entry as returned by Toggl.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub stop: Option<DateTime<FixedOffset>>,
    /// Seconds; negative while the entry is running.
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub task_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CreateTimeEntry<'a> {
    description: &'a str,
    start: String,
    stop: String,
    duration: i64,
    workspace_id: u64,
    created_with: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<u64>,
}

fn iso8601(timestamp: DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn parse_id(field: &'static str, value: Option<&str>) -> Result<Option<u64>, TogglError> {
    value
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| TogglError::InvalidReference {
                    field,
                    value: value.to_string(),
                })
        })
        .transpose()
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TogglError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|err| TogglError::InvalidResponse(err.to_string()))
}

/// Builds an [`TogglError::Api`] from the server's message and tip, a plain
/// text body, or failing both the status reason.
fn api_error(status: StatusCode, body: &str) -> TogglError {
    let message = parse_error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    });
    TogglError::Api {
        status: status.as_u16(),
        message,
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
        #[serde(default)]
        tip: Option<String>,
    }

    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let mut parts = vec![payload.error.message];
        parts.extend(payload.error.tip.filter(|tip| !tip.is_empty()));
        return Some(parts.join(". "));
    }

    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(_) => return None,
        Err(_) => body.to_string(),
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
