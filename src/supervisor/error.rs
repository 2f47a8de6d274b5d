use thiserror::Error;

/// Why a generation ended without being cancelled from above.
///
/// Every variant here is fatal to the *generation*, not to the supervisor itself:
/// [`crate::supervisor::Supervisor`] turns each of these into an
/// `IndexStateUpdate::IndexFailed` transition and starts a fresh generation.
#[derive(Error, Debug)]
pub enum Error {
    /// The watcher returned a fatal error (overflow, root missing, walk exhausted
    /// its retries).
    #[error("watcher failed: {0}")]
    Watcher(#[from] crate::watcher::Error),

    /// The watcher task finished without an error, which should never happen for a
    /// live (non-snapshot) generation: the watcher only returns on fatal error.
    #[error("watcher exited unexpectedly")]
    WatcherExited,

    /// The indexer pool's event channel closed, which for a live generation only
    /// happens once the watcher has already gone away.
    #[error("indexer pool exited unexpectedly")]
    IndexerExited,

    /// The index actor's inbox closed on its own.
    #[error("index actor shut down unexpectedly")]
    IndexActorExited,

    /// A pipeline task panicked instead of returning.
    #[error("child task panicked: {0}")]
    ChildPanicked(tokio::task::JoinError),
}
