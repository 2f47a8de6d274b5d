use std::collections::{HashMap, HashSet};

use crate::config::Mode;
use crate::models::{
    FileAddress, IndexStateUpdate, Interner, StatusCounters, StatusResult, StatusUpdate, Token,
};

/// The state owned exclusively by the index actor: the forward/reverse maps,
/// per-file update times, and the status counters.
///
/// `IndexState` is never shared by reference: only the actor task in
/// [`crate::index`] ever touches it, which is what lets every mutation below run
/// without locks.
#[derive(Debug)]
pub struct IndexState {
    pub(crate) mode: Mode,
    pub(crate) forward: HashMap<FileAddress, HashSet<Token>>,
    pub(crate) reverse: HashMap<Token, HashSet<FileAddress>>,
    file_update_times: HashMap<FileAddress, u64>,
    token_interner: Interner<String>,
    counters: StatusCounters,
    /// Filled whenever a mutation crosses a lifecycle milestone (watcher started,
    /// all files discovered, initial sync completed) the supervisor's status stream
    /// cares about. A single `AllFilesDiscovered` status can itself complete the
    /// sync, queueing both transitions at once, so this is a small queue rather
    /// than a single slot. Drained by [`IndexState::take_transitions`] after every
    /// message the actor processes.
    pending_transitions: Vec<IndexStateUpdate>,
}

/// An owned, point-in-time copy of the maps a query scans.
///
/// `FileAddress` and `Token` are interned `Arc` handles, so cloning these maps only
/// duplicates the map/set structure, not the underlying strings. Handing a snapshot
/// to a query's own task (rather than scanning `IndexState` directly from inside the
/// actor) is what keeps a large query from holding up the actor's critical section:
/// the expensive part of a query, the substring/prefix/suffix comparisons across
/// every bucket, runs entirely off the actor's task.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub(crate) mode: Mode,
    pub(crate) forward: HashMap<FileAddress, HashSet<Token>>,
    pub(crate) reverse: HashMap<Token, HashSet<FileAddress>>,
}

impl IndexState {
    /// Construct an empty index state for the given tokenization mode, stamping
    /// `start_time` to now.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            forward: HashMap::new(),
            reverse: HashMap::new(),
            file_update_times: HashMap::new(),
            token_interner: Interner::default(),
            counters: StatusCounters {
                start_time: Some(chrono::Utc::now()),
                ..StatusCounters::default()
            },
            pending_transitions: Vec::new(),
        }
    }

    /// Drain the lifecycle transitions (if any) produced by the most recently
    /// applied mutation, in the order they occurred.
    ///
    /// Callers (the actor's message loop) should call this after every
    /// `apply_status`/`apply_update_file_content`/`apply_remove_file` call and
    /// forward each result to the supervisor's status stream.
    pub fn take_transitions(&mut self) -> Vec<IndexStateUpdate> {
        std::mem::take(&mut self.pending_transitions)
    }

    /// Apply an `UpdateFileContent` mutation.
    ///
    /// Returns `true` if the update was applied, `false` if it was discarded as
    /// out-of-order.
    pub fn apply_update_file_content(
        &mut self,
        t: u64,
        fa: FileAddress,
        tokens: HashSet<String>,
    ) -> bool {
        let last = self.file_update_times.get(&fa).copied().unwrap_or(0);
        if t <= last {
            log::debug!(
                "Discarding out-of-order update for {fa} (t={t}, last applied={last})"
            );
            return false;
        }

        self.file_update_times.insert(fa.clone(), t);

        let interned: HashSet<Token> = tokens
            .into_iter()
            .map(|token| Token::from_interned(self.token_interner.intern(token)))
            .collect();

        if let Some(previous) = self.forward.get(&fa) {
            for token in previous {
                if let Some(bucket) = self.reverse.get_mut(token) {
                    bucket.remove(&fa);
                    if bucket.is_empty() {
                        self.reverse.remove(token);
                    }
                }
            }
        }

        for token in &interned {
            self.reverse
                .entry(token.clone())
                .or_default()
                .insert(fa.clone());
        }

        self.forward.insert(fa, interned);

        self.handled_one();

        true
    }

    /// Apply a `RemoveFile` mutation.
    ///
    /// Returns `true` if the removal was applied, `false` if it was discarded as
    /// out-of-order.
    pub fn apply_remove_file(&mut self, t: u64, fa: FileAddress) -> bool {
        let last = self.file_update_times.get(&fa).copied().unwrap_or(0);
        if t <= last {
            log::debug!(
                "Discarding out-of-order removal for {fa} (t={t}, last applied={last})"
            );
            return false;
        }

        self.file_update_times.insert(fa.clone(), t);

        if let Some(previous) = self.forward.remove(&fa) {
            for token in &previous {
                if let Some(bucket) = self.reverse.get_mut(token) {
                    bucket.remove(&fa);
                    if bucket.is_empty() {
                        self.reverse.remove(token);
                    }
                }
            }
        }

        self.handled_one();

        true
    }

    fn handled_one(&mut self) {
        self.counters.handled_modifications += 1;
        self.check_sync_completed();
    }

    /// Stamp `sync_completed_at` (and queue its transition) if every precondition
    /// now holds.
    ///
    /// This must be checked both when a modification is handled (the usual case)
    /// and when `AllFilesDiscovered` arrives, since the last in-flight update can
    /// finish indexing before or after that signal reaches the actor, both orders
    /// are legitimate outcomes of running indexer workers in parallel.
    fn check_sync_completed(&mut self) {
        if self.counters.all_files_discovered_at.is_some()
            && self.counters.sync_completed_at.is_none()
            && self.counters.handled_modifications >= self.counters.total_modifications
        {
            let now = chrono::Utc::now();
            self.counters.sync_completed_at = Some(now);
            self.pending_transitions.push(IndexStateUpdate::InitialFileSyncCompleted(now));
        }
    }

    /// Apply a status signal, mutating only the counters.
    pub fn apply_status(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::FileUpdated => {
                self.counters.total_modifications += 1;
            }
            StatusUpdate::WatcherStarted => {
                if self.counters.watcher_started_at.is_none() {
                    let now = chrono::Utc::now();
                    self.counters.watcher_started_at = Some(now);
                    self.pending_transitions.push(IndexStateUpdate::WatcherStarted(now));
                }
            }
            StatusUpdate::AllFilesDiscovered => {
                if self.counters.all_files_discovered_at.is_none() {
                    let now = chrono::Utc::now();
                    self.counters.all_files_discovered_at = Some(now);
                    self.pending_transitions.push(IndexStateUpdate::AllFilesDiscovered(now));
                }
                self.check_sync_completed();
            }
            StatusUpdate::WatcherDiscoveredFileDuringInitialization => {
                self.counters.files_discovered_by_watcher_during_init += 1;
            }
        }
    }

    /// Snapshot the counters into a [`StatusResult`].
    #[must_use]
    pub fn status(&self) -> StatusResult {
        let start_time = self.counters.start_time.unwrap_or_else(chrono::Utc::now);

        let total = if self.counters.all_files_discovered_at.is_none() {
            self.counters
                .total_modifications
                .max(self.counters.files_discovered_by_watcher_during_init)
        } else {
            self.counters.total_modifications
        };

        StatusResult {
            indexed_files: self.forward.len(),
            known_tokens: self.reverse.len(),
            watcher_start_time: self
                .counters
                .watcher_started_at
                .map(|at| (at - start_time).to_std().unwrap_or_default()),
            initial_sync_time: self
                .counters
                .sync_completed_at
                .map(|at| (at - start_time).to_std().unwrap_or_default()),
            handled: self.counters.handled_modifications,
            total,
            is_broken: false,
        }
    }

    /// The tokenization mode this index was built with.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Snapshot the forward/reverse maps so a query can scan them from its own task
    /// instead of the actor's.
    #[must_use]
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            mode: self.mode,
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
        }
    }
}
