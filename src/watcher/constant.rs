use std::time::Duration;

/// Maximum number of attempts at the initial walk before giving up.
pub const MAX_WALK_ATTEMPTS: u32 = 10;

/// Per-attempt linear backoff step: attempt `n` waits `(n - 1) * BACKOFF_STEP`.
pub const BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Capacity of the channel carrying raw events from the `notify` callback into the
/// async watcher loop.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 1024;
