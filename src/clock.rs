//! The logical clock used to order concurrent indexer results.
//!
//! Indexer workers run in parallel and may finish tokenizing a file in any order
//! relative to one another. The logical clock, incremented once per emitted
//! [`crate::models::FileSyncEvent`], lets the index actor discard stale results
//! whenever a newer update for the same file has already been applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter, incremented by the sync stage on every emitted
/// event.
///
/// Cloning a `LogicalClock` shares the same underlying counter: it is an `Arc`
/// wrapper so that it can be handed to the watcher at generation start and read
/// (never incremented) by nothing else.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock(Arc<AtomicU64>);

impl LogicalClock {
    /// Create a new clock starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically increment the clock and return the new value.
    ///
    /// Only the sync stage should call this; every other component treats `t` values
    /// as opaque, already-assigned timestamps.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Read the current value without incrementing it.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
