//! Error types for the model facade.

use lazytree_core::Address;
use lazytree_source::SourceError;
use lazytree_sync::SyncError;
use thiserror::Error;

/// Rejection from a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The scheduler no longer accepts work.
    #[error("scheduler is closed")]
    Closed,
}

/// Errors that can occur during model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Cache lookup, resolution or validation error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Source mutation error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Deferred work could not be scheduled.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// The address no longer refers to a live node.
    #[error("stale address: {0}")]
    StaleAddress(Address),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
