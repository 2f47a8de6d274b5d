use std::time::Duration;

/// A status signal emitted by any stage of the pipeline into the shared status queue.
///
/// The index actor consumes these to update its [`StatusCounters`]. Unlike [`crate::models::event::FileSyncEvent`], status
/// updates never mutate the forward/reverse maps.
#[derive(Debug, Clone, Copy)]
pub enum StatusUpdate {
    /// The watcher has subscribed to filesystem notifications and begun its initial
    /// walk.
    WatcherStarted,
    /// The initial walk has finished enumerating every file.
    AllFilesDiscovered,
    /// A `FileSyncEvent` was observed (of any kind or source).
    FileUpdated,
    /// The watcher observed a live notification for a file before the initial walk
    /// had finished discovering it.
    WatcherDiscoveredFileDuringInitialization,
}

/// Counters owned exclusively by the index actor, snapshotted into a [`StatusResult`]
/// on request.
#[derive(Debug, Clone, Default)]
pub struct StatusCounters {
    /// Wall-clock time the actor started, set once at construction.
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Wall-clock time `WatcherStarted` was observed.
    pub watcher_started_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Wall-clock time `AllFilesDiscovered` was observed.
    pub all_files_discovered_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Wall-clock time the initial sync finished applying every discovered file.
    pub sync_completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Count of `FileUpdated` status signals observed.
    pub total_modifications: u64,
    /// Count of index updates (`UpdateFileContent`/`RemoveFile`) actually applied.
    pub handled_modifications: u64,
    /// Watcher hits observed before the initial walk finished discovering every file.
    pub files_discovered_by_watcher_during_init: u64,
}

/// The response to a `Status` user request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusResult {
    /// Number of files currently present in the forward index.
    pub indexed_files: usize,
    /// Number of distinct tokens currently present in the reverse index.
    pub known_tokens: usize,
    /// Elapsed time between actor start and the watcher starting, if known.
    pub watcher_start_time: Option<Duration>,
    /// Elapsed time between actor start and the initial sync completing, if known.
    pub initial_sync_time: Option<Duration>,
    /// Index updates applied so far.
    pub handled: u64,
    /// File-sync events observed so far (during pre-init, this is
    /// `max(total_modifications, files_discovered_by_watcher_during_init)`).
    pub total: u64,
    /// Whether this status was reported between supervisor generations.
    pub is_broken: bool,
}

impl StatusResult {
    /// The fixed status reported between supervisor generations.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            indexed_files: 0,
            known_tokens: 0,
            watcher_start_time: None,
            initial_sync_time: None,
            handled: 0,
            total: 0,
            is_broken: true,
        }
    }
}

/// A transition in the supervisor's generation lifecycle, broadcast to observers via
/// a `tokio::sync::watch` channel.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum IndexStateUpdate {
    /// Synthetic value emitted before any generation has started.
    Initial,
    /// A new generation is starting.
    Initializing(chrono::DateTime<chrono::Utc>),
    /// The watcher has started for the current generation.
    WatcherStarted(chrono::DateTime<chrono::Utc>),
    /// The initial walk finished and every discovered file has been applied.
    InitialFileSyncCompleted(chrono::DateTime<chrono::Utc>),
    /// The initial walk finished enumerating every file (but updates may still be
    /// in flight).
    AllFilesDiscovered(chrono::DateTime<chrono::Utc>),
    /// The current generation failed.
    IndexFailed(String),
    /// The supervisor is tearing down the failed generation and starting a new one.
    Restarting,
    /// The supervisor has been cancelled from above and will not restart.
    Terminated(String),
}

#[cfg(test)]
mod tests {
    use super::{IndexStateUpdate, StatusResult};

    #[test]
    fn test_status_result_serializes_to_json() {
        let status = StatusResult {
            indexed_files: 3,
            known_tokens: 12,
            watcher_start_time: Some(std::time::Duration::from_millis(5)),
            initial_sync_time: None,
            handled: 3,
            total: 3,
            is_broken: false,
        };

        let json = serde_json::to_string(&status).unwrap();
        let round_tripped: StatusResult = serde_json::from_str(&json).unwrap();

        assert_eq!(round_tripped.indexed_files, 3);
        assert!(!round_tripped.is_broken);
    }

    #[test]
    fn test_index_state_update_serializes_to_json() {
        let update = IndexStateUpdate::IndexFailed("watcher overflowed".to_string());

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("watcher overflowed"));
    }
}
