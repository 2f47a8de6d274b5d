use std::path::PathBuf;

use thiserror::Error;

/// Errors that can end a watcher generation.
///
/// Every variant here is fatal to the current generation: the supervisor
/// observes it, tears the generation down, and starts a fresh one.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying `notify` watcher could not be set up.
    #[error("failed to set up filesystem notifications: {0}")]
    NotifySetupFailed(notify::Error),

    /// The root directory does not exist, or stopped existing mid-walk.
    #[error("root directory {0} does not exist")]
    RootNotFound(PathBuf),

    /// The initial walk failed after exhausting all retries.
    #[error("initial walk of {0} failed after all retries: {1}")]
    WalkFailed(PathBuf, std::io::Error),

    /// The notifier reported a buffer overflow: some filesystem events were
    /// dropped before they could be read. The index can no longer be trusted to
    /// reflect the tree, so the generation must restart from a fresh walk.
    #[error("filesystem notifier overflowed, some events were lost")]
    Overflow,

    /// The channel carrying raw `notify` events closed unexpectedly.
    #[error("filesystem notification channel closed unexpectedly")]
    ChannelClosed,
}
