//! Startup configuration for a `grepd` generation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The default number of parallel indexer workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// The default maximum file size, in bytes, that will be indexed.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// The tokenization strategy an index uses, selected once at startup.
///
/// Both the indexer (which produces tokens from file content) and the index actor
/// (which matches a query's tokens against the reverse index) dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Tokenize on runs of alphanumeric characters.
    Word,
    /// Tokenize every 3-character sliding window of a line.
    Trigram,
}

/// A callback invoked when the watcher fails to start or the initial walk ultimately
/// fails after retries.
pub type WatcherErrorHandler = Arc<dyn Fn(&crate::watcher::Error) + Send + Sync>;

/// A callback invoked when a single file fails to be applied during the initial sync.
pub type InitialFileSyncErrorHandler = Arc<dyn Fn(&std::path::Path, &std::io::Error) + Send + Sync>;

/// Configuration for one `grepd` index.
///
/// A `Config` is consumed once per supervisor: every restarted generation reuses the
/// same `Config`, since none of these options are expected to change mid-run.
#[derive(Clone)]
pub struct Config {
    /// Root directory to index. Must exist at start; its disappearance mid-run is a
    /// fatal generation error.
    pub root: PathBuf,
    /// Tokenization/matching strategy.
    pub mode: Mode,
    /// If `false`, the tree is walked once and then the watcher parks until
    /// cancelled (a one-shot snapshot).
    pub enable_watcher: bool,
    /// Runtime-toggleable trace logging flag.
    pub enable_logging: Arc<AtomicBool>,
    /// Number of parallel indexer workers.
    pub worker_count: usize,
    /// Files larger than this are skipped entirely.
    pub max_file_size_bytes: u64,
    /// Optional diagnostic callback for watcher/initial-walk failures.
    pub handle_watcher_error: Option<WatcherErrorHandler>,
    /// Optional diagnostic callback for per-file initial-sync failures.
    pub handle_initial_file_sync_error: Option<InitialFileSyncErrorHandler>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("enable_watcher", &self.enable_watcher)
            .field("worker_count", &self.worker_count)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build a new configuration for indexing `root` with `mode`.
    ///
    /// Watching is enabled and logging is disabled by default; the worker count and
    /// file size cap default to the values hard-coded defaults.
    #[must_use]
    pub fn new(root: PathBuf, mode: Mode) -> Self {
        Self {
            root,
            mode,
            enable_watcher: true,
            enable_logging: Arc::new(AtomicBool::new(false)),
            worker_count: DEFAULT_WORKER_COUNT,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            handle_watcher_error: None,
            handle_initial_file_sync_error: None,
        }
    }

    /// Disable the watcher, producing a one-shot snapshot index.
    #[must_use]
    pub fn with_watcher_disabled(mut self) -> Self {
        self.enable_watcher = false;
        self
    }

    /// Override the number of parallel indexer workers.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Override the maximum indexable file size, in bytes.
    #[must_use]
    pub fn with_max_file_size_bytes(mut self, max_file_size_bytes: u64) -> Self {
        self.max_file_size_bytes = max_file_size_bytes;
        self
    }

    /// Register a callback invoked on watcher/initial-walk failures.
    #[must_use]
    pub fn with_watcher_error_handler(mut self, handler: WatcherErrorHandler) -> Self {
        self.handle_watcher_error = Some(handler);
        self
    }

    /// Register a callback invoked on per-file initial-sync failures.
    #[must_use]
    pub fn with_initial_file_sync_error_handler(
        mut self,
        handler: InitialFileSyncErrorHandler,
    ) -> Self {
        self.handle_initial_file_sync_error = Some(handler);
        self
    }
}
