//! Idempotent push of intervals to a remote time tracker.
//!
//! Each interval is checked against the remote before creation: if any
//! entry overlaps its [`OverlapWindow`](crate::OverlapWindow), nothing is
//! created. Intervals are processed strictly one after another so the
//! check and the create for one interval never race another's.

use std::fmt;
use std::future::Future;

use tracing::{debug, error, info};

use crate::interval::{Interval, NewTimeEntry, OverlapWindow};

/// The two remote operations the sync logic depends on.
pub trait TimeEntryApi {
    /// Whatever the remote returns for an entry.
    type Record;
    type Error: fmt::Display;

    /// Lists entries overlapping `window`.
    fn list_time_entries(
        &self,
        window: &OverlapWindow,
    ) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>>;

    /// Creates one entry.
    fn create_time_entry(
        &self,
        entry: &NewTimeEntry,
    ) -> impl Future<Output = Result<Self::Record, Self::Error>>;
}

/// What happened to a pushed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome<R> {
    Created(R),
    /// The remote already had entries in range; nothing was sent.
    AlreadyExists { existing: usize },
}

/// Totals for one [`SyncClient::push_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Pushes intervals through a [`TimeEntryApi`].
#[derive(Debug)]
pub struct SyncClient<A> {
    api: A,
}

impl<A: TimeEntryApi> SyncClient<A> {
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Creates `interval` remotely unless an overlapping entry exists.
    pub async fn push(&self, interval: &Interval) -> Result<PushOutcome<A::Record>, A::Error> {
        info!(entry = interval.source_label(), "attempting to create time entry");

        let existing = self
            .api
            .list_time_entries(&interval.overlap_window())
            .await?;
        if !existing.is_empty() {
            info!(
                existing = existing.len(),
                "won't create time entry, entry already exists in this range"
            );
            return Ok(PushOutcome::AlreadyExists {
                existing: existing.len(),
            });
        }

        let entry = interval.to_new_entry();
        debug!(?entry, "entry params for create request");
        let record = self.api.create_time_entry(&entry).await?;
        Ok(PushOutcome::Created(record))
    }

    /// Pushes every interval in order, logging failures and moving on.
    pub async fn push_all(&self, intervals: &[Interval]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for interval in intervals {
            match self.push(interval).await {
                Ok(PushOutcome::Created(_)) => summary.created += 1,
                Ok(PushOutcome::AlreadyExists { .. }) => summary.existing += 1,
                Err(err) => {
                    error!(entry = interval.source_label(), %err, "failed to push time entry");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
