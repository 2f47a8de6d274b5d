use std::collections::HashSet;

use tokio::sync::{mpsc, oneshot};

use crate::models::{FileAddress, StatusResult};

/// An index-update request, emitted by the indexer pool.
#[derive(Debug)]
pub enum IndexUpdateRequest {
    /// A file was created or modified; `tokens` is the deduplicated token set read
    /// from its current content.
    UpdateFileContent {
        /// Logical send time, for ordering against other updates to the same file.
        t: u64,
        /// The file this update concerns.
        fa: FileAddress,
        /// The file's current, deduplicated token set.
        tokens: HashSet<String>,
    },
    /// A file was deleted.
    RemoveFile {
        /// Logical send time.
        t: u64,
        /// The file that was removed.
        fa: FileAddress,
    },
}

/// A request made by a caller of [`crate::index::IndexHandle`].
#[derive(Debug)]
pub enum UserRequest {
    /// Snapshot the current status counters.
    Status(oneshot::Sender<StatusResult>),
    /// Stream every file whose tokens match `query`, in candidate (unverified)
    /// order.
    Find {
        /// The raw query string.
        query: String,
        /// Candidates are pushed here as they're found; dropping the receiver
        /// cancels the producer.
        respond_to: mpsc::Sender<FileAddress>,
    },
}

/// The union of everything the index actor's single inbox multiplexes.
#[derive(Debug)]
pub(crate) enum Message {
    Status(crate::models::StatusUpdate),
    Update(IndexUpdateRequest),
    User(UserRequest),
}
