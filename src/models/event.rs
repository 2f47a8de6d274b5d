use crate::models::FileAddress;

/// Where a [`FileSyncEvent`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Emitted while walking the tree once at startup.
    InitialSync,
    /// Emitted from a live filesystem notification.
    Watcher,
}

/// The kind of change a [`FileSyncEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new regular file was observed.
    Create,
    /// An existing regular file's content changed.
    Modify,
    /// A previously observed file no longer exists.
    Delete,
}

/// One unit of the serialized stream the watcher emits.
///
/// `t` is assigned from the [`crate::clock::LogicalClock`] at send time, and is used
/// by the index actor to discard results from indexer workers that finish out of
/// order.
#[derive(Debug, Clone)]
pub struct FileSyncEvent {
    /// Logical send time.
    pub t: u64,
    /// The file this event concerns.
    pub fa: FileAddress,
    /// Whether this event came from the initial walk or a live notification.
    pub source: EventSource,
    /// What kind of change occurred.
    pub kind: Event,
}
