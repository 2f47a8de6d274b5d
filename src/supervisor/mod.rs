//! Resurrecting supervisor.
//!
//! Launches one "generation" of watcher + indexer pool + index actor as a group of
//! `tokio` tasks, races them against an outer cancellation signal, and on any
//! failure (or unexpected exit) of any child, tears the rest down and starts a
//! fresh generation: start generation → await child failure → publish IndexFailed →
//! cancel siblings → publish Restarting → loop, with an outer-cancellation exit that
//! publishes `Terminated` instead of restarting.

mod error;

pub use error::Error;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::{JoinError, JoinSet};

use crate::clock::LogicalClock;
use crate::config::Config;
use crate::index::IndexHandle;
use crate::models::{FileSyncEvent, IndexStateUpdate};
use crate::{indexer, watcher};

/// A cheap, cloneable handle to the supervisor's background generation loop.
///
/// Every clone shares the same underlying `watch` channels, so handing a clone to a
/// [`crate::search::SearchEngine`] lets it always see the latest generation's index
/// actor and the latest lifecycle transition, without needing to reach into the
/// loop itself.
#[derive(Debug, Clone)]
pub struct Supervisor {
    handle_rx: watch::Receiver<Option<IndexHandle>>,
    state_rx: watch::Receiver<IndexStateUpdate>,
    cancel: Arc<Notify>,
    enable_logging: Arc<AtomicBool>,
}

impl Supervisor {
    /// Launch the resurrecting supervisor loop for `config`, returning a handle to
    /// it and the `tokio` task running the loop.
    #[must_use]
    pub fn spawn(config: Config) -> (Self, tokio::task::JoinHandle<()>) {
        let enable_logging = Arc::clone(&config.enable_logging);
        let config = Arc::new(config);
        let (handle_tx, handle_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(IndexStateUpdate::Initial);
        let cancel = Arc::new(Notify::new());

        let supervisor = Self {
            handle_rx,
            state_rx,
            cancel: Arc::clone(&cancel),
            enable_logging,
        };

        let join_handle = tokio::spawn(run_loop(config, handle_tx, state_tx, cancel));

        (supervisor, join_handle)
    }

    /// A handle to the current generation's index actor, or `None` between
    /// generations (the "broken" window).
    #[must_use]
    pub fn current_index(&self) -> Option<IndexHandle> {
        self.handle_rx.borrow().clone()
    }

    /// The shared, runtime-toggleable trace-logging flag.
    ///
    /// This is the same `Arc<AtomicBool>` the originating `Config` carries, so
    /// toggling it from an external command interface is observed immediately by
    /// every in-flight search.
    #[must_use]
    pub fn enable_logging(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enable_logging)
    }

    /// Subscribe to generation-lifecycle transitions.
    ///
    /// A freshly subscribed receiver immediately observes the latest published
    /// value (replay-1, drop-oldest); no history beyond that is buffered.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IndexStateUpdate> {
        self.state_rx.clone()
    }

    /// Cancel the supervisor: the current generation is torn down, `Terminated` is
    /// published, and no further generation is started.
    ///
    /// Cancellation from above is never treated as a failure and is never
    /// restarted.
    pub fn shutdown(&self) {
        self.cancel.notify_one();
    }
}

async fn run_loop(
    config: Arc<Config>,
    handle_tx: watch::Sender<Option<IndexHandle>>,
    state_tx: watch::Sender<IndexStateUpdate>,
    cancel: Arc<Notify>,
) {
    loop {
        let _ = state_tx.send(IndexStateUpdate::Initializing(chrono::Utc::now()));

        let outcome = run_generation(Arc::clone(&config), &handle_tx, &state_tx, Arc::clone(&cancel)).await;

        let _ = handle_tx.send(None);

        match outcome {
            GenerationOutcome::Cancelled => {
                log::info!("Supervisor cancelled, not restarting");
                let _ = state_tx.send(IndexStateUpdate::Terminated("cancelled".to_string()));
                return;
            }
            GenerationOutcome::Failed(err) => {
                log::warn!("Generation failed: {err}");
                let _ = state_tx.send(IndexStateUpdate::IndexFailed(err.to_string()));
                let _ = state_tx.send(IndexStateUpdate::Restarting);
            }
        }
    }
}

/// What ended one generation.
enum GenerationOutcome {
    /// Cancelled from above; the supervisor will not restart.
    Cancelled,
    /// A child failed, exited unexpectedly, or panicked.
    Failed(Error),
}

/// What a pipeline child task returned, before its outcome is classified.
enum ChildOutcome {
    Watcher(Result<(), watcher::Error>),
    /// The indexer pool only ever "completes" when its event channel closes, which
    /// for a live generation only happens when the watcher has already gone away.
    Indexer,
    /// The status-transition relay task only ends when the index actor's internal
    /// `watch` sender is dropped, i.e. the actor itself has shut down.
    StatusRelay,
}

async fn run_generation(
    config: Arc<Config>,
    handle_tx: &watch::Sender<Option<IndexHandle>>,
    state_tx: &watch::Sender<IndexStateUpdate>,
    cancel: Arc<Notify>,
) -> GenerationOutcome {
    let clock = LogicalClock::new();
    let (index, mut index_join) = IndexHandle::spawn(config.mode);
    let _ = handle_tx.send(Some(index.clone()));

    let (events_tx, events_rx) = mpsc::unbounded_channel::<FileSyncEvent>();

    let mut children: JoinSet<ChildOutcome> = JoinSet::new();

    children.spawn({
        let config = Arc::clone(&config);
        let clock = clock.clone();
        let index = index.clone();
        async move { ChildOutcome::Watcher(watcher::run(config, clock, index, events_tx).await) }
    });

    children.spawn({
        let config = Arc::clone(&config);
        let index = index.clone();
        async move {
            indexer::run(config, events_rx, index).await;
            ChildOutcome::Indexer
        }
    });

    children.spawn({
        let mut inner_state_rx = index.subscribe_state();
        let state_tx = state_tx.clone();
        async move {
            while inner_state_rx.changed().await.is_ok() {
                let transition = inner_state_rx.borrow().clone();
                let _ = state_tx.send(transition);
            }
            ChildOutcome::StatusRelay
        }
    });

    let outcome = tokio::select! {
        Some(result) = children.join_next() => classify(result),
        result = &mut index_join => {
            GenerationOutcome::Failed(match result {
                Ok(()) => Error::IndexActorExited,
                Err(err) => Error::ChildPanicked(err),
            })
        }
        () = cancel.notified() => GenerationOutcome::Cancelled,
    };

    children.abort_all();
    index_join.abort();

    outcome
}

fn classify(result: Result<ChildOutcome, JoinError>) -> GenerationOutcome {
    match result {
        Ok(ChildOutcome::Watcher(Ok(()))) => GenerationOutcome::Failed(Error::WatcherExited),
        Ok(ChildOutcome::Watcher(Err(err))) => GenerationOutcome::Failed(Error::Watcher(err)),
        Ok(ChildOutcome::Indexer) => GenerationOutcome::Failed(Error::IndexerExited),
        Ok(ChildOutcome::StatusRelay) => GenerationOutcome::Failed(Error::IndexActorExited),
        Err(join_err) if join_err.is_cancelled() => GenerationOutcome::Cancelled,
        Err(join_err) => GenerationOutcome::Failed(Error::ChildPanicked(join_err)),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::config::Mode;

    use super::*;

    #[tokio::test]
    async fn test_initial_generation_reaches_initial_file_sync_completed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();

        let config = Config::new(dir.path().to_path_buf(), Mode::Word);
        let (supervisor, _join) = Supervisor::spawn(config);

        let mut state_rx = supervisor.subscribe();
        let deadline = tokio::time::sleep(Duration::from_secs(5));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    changed.expect("supervisor still running");
                    if matches!(*state_rx.borrow(), IndexStateUpdate::InitialFileSyncCompleted(_)) {
                        break;
                    }
                }
                () = &mut deadline => panic!("initial sync never completed"),
            }
        }

        let status = supervisor.current_index().unwrap().status().await;
        assert_eq!(status.indexed_files, 1);
    }

    #[tokio::test]
    async fn test_enable_logging_shares_the_configs_flag() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf(), Mode::Word);
        let config_flag = Arc::clone(&config.enable_logging);

        let (supervisor, join) = Supervisor::spawn(config);
        let supervisor_flag = supervisor.enable_logging();

        assert!(!supervisor_flag.load(std::sync::atomic::Ordering::Relaxed));
        config_flag.store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(supervisor_flag.load(std::sync::atomic::Ordering::Relaxed));

        supervisor.shutdown();
        let _ = join.await;
    }

    #[tokio::test]
    async fn test_shutdown_publishes_terminated_and_stops_restarting() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf(), Mode::Word);
        let (supervisor, join) = Supervisor::spawn(config);

        supervisor.shutdown();

        tokio::time::timeout(Duration::from_secs(5), join)
            .await
            .expect("supervisor loop should exit promptly")
            .expect("supervisor task should not panic");

        assert!(supervisor.current_index().is_none());
    }

    #[tokio::test]
    async fn test_status_is_broken_between_generations() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf(), Mode::Word);
        let (supervisor, join) = Supervisor::spawn(config);

        supervisor.shutdown();
        let _ = join.await;

        assert!(supervisor.current_index().is_none());
    }
}
