//! Core domain logic for org-toggl.
//!
//! This crate contains the fundamental types and logic for:
//! - Node: an arena-backed view over an exported Org document tree
//! - Extraction: walking the tree for closed, qualifying CLOCK entries
//! - Sync: pushing intervals to a remote time tracker without duplicates

pub mod extract;
pub mod interval;
pub mod node;
pub mod sync;
pub mod types;

pub use extract::{ExtractError, Extraction, Extractor, Retention};
pub use interval::{Interval, NewTimeEntry, OverlapWindow, is_placeholder_project};
pub use node::{Ancestors, ChildRef, Node, NodeId, ParseError, Tree};
pub use sync::{PushOutcome, SyncClient, SyncSummary, TimeEntryApi};
pub use types::{ProjectRef, TaskRef, ValidationError};
