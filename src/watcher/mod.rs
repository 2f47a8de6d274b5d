//! Walks a directory tree once, then keeps it watched for live changes.
//!
//! This is the only component that ever creates a [`FileAddress`]: every other
//! stage receives addresses already interned here and compares them by identity.

mod constant;
mod error;

pub use error::Error;

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;

use crate::clock::LogicalClock;
use crate::config::Config;
use crate::index::IndexHandle;
use crate::models::{Event, EventSource, FileAddress, FileSyncEvent, Interner, StatusUpdate};

/// Run one generation of the watcher against `config`, forwarding every
/// [`FileSyncEvent`] it produces to `events_tx` and every status signal to `index`.
///
/// Returns only on a fatal error (or, for watcher-off mode, never: the caller is
/// expected to cancel the task instead). On a fatal error, `config.handle_watcher_error`
/// is invoked (if registered) alongside an unconditional `log::error!`.
pub async fn run(
    config: std::sync::Arc<Config>,
    clock: LogicalClock,
    index: IndexHandle,
    events_tx: mpsc::UnboundedSender<FileSyncEvent>,
) -> Result<(), Error> {
    let result = run_inner(std::sync::Arc::clone(&config), clock, index, events_tx).await;

    if let Err(err) = &result {
        log::error!("Watcher generation ended with a fatal error: {err}");
        if let Some(handler) = &config.handle_watcher_error {
            handler(err);
        }
    }

    result
}

async fn run_inner(
    config: std::sync::Arc<Config>,
    clock: LogicalClock,
    index: IndexHandle,
    events_tx: mpsc::UnboundedSender<FileSyncEvent>,
) -> Result<(), Error> {
    let file_interner: Interner<String> = Interner::default();

    if !config.enable_watcher {
        return run_snapshot_only(&config, &clock, &index, &events_tx, &file_interner).await;
    }

    let (raw_tx, mut raw_rx) = mpsc::channel(constant::NOTIFY_CHANNEL_CAPACITY);

    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if raw_tx.blocking_send(res).is_err() {
                log::debug!("dropped a filesystem notification: watcher channel closed");
            }
        })
        .map_err(Error::NotifySetupFailed)?;

    watcher
        .watch(&config.root, RecursiveMode::Recursive)
        .map_err(Error::NotifySetupFailed)?;

    index.send_status(StatusUpdate::WatcherStarted).await;

    let mut buffered: Vec<notify::Event> = Vec::new();
    let walk_handle = tokio::task::spawn_blocking({
        let root = config.root.clone();
        move || walk_with_retries(&root)
    });
    tokio::pin!(walk_handle);

    let paths = loop {
        tokio::select! {
            result = &mut walk_handle => {
                match result {
                    Ok(res) => break res?,
                    Err(join_err) => {
                        return Err(Error::WalkFailed(config.root.clone(), std::io::Error::other(join_err)));
                    }
                }
            }
            maybe_raw = raw_rx.recv() => {
                match maybe_raw {
                    Some(Ok(event)) => {
                        if map_event_kind(event.kind).is_some() {
                            for _ in &event.paths {
                                index.send_status(StatusUpdate::WatcherDiscoveredFileDuringInitialization).await;
                            }
                            buffered.push(event);
                        }
                    }
                    Some(Err(_)) => return Err(Error::Overflow),
                    None => return Err(Error::ChannelClosed),
                }
            }
        }
    };

    for path in paths {
        emit_initial(&path, &clock, &index, &events_tx, &file_interner).await;
    }

    index.send_status(StatusUpdate::AllFilesDiscovered).await;

    for event in buffered {
        handle_raw_event(Ok(event), &clock, &index, &events_tx, &file_interner).await?;
    }

    loop {
        match raw_rx.recv().await {
            Some(raw) => handle_raw_event(raw, &clock, &index, &events_tx, &file_interner).await?,
            None => return Err(Error::ChannelClosed),
        }
    }
}

/// Watch-disabled mode: walk once, report the tree as fully discovered, then park
/// until the caller cancels this task.
async fn run_snapshot_only(
    config: &Config,
    clock: &LogicalClock,
    index: &IndexHandle,
    events_tx: &mpsc::UnboundedSender<FileSyncEvent>,
    file_interner: &Interner<String>,
) -> Result<(), Error> {
    index.send_status(StatusUpdate::WatcherStarted).await;

    let root = config.root.clone();
    let paths = tokio::task::spawn_blocking(move || walk_with_retries(&root))
        .await
        .unwrap_or_else(|join_err| {
            Err(Error::WalkFailed(
                config.root.clone(),
                std::io::Error::other(join_err),
            ))
        })?;

    for path in paths {
        emit_initial(&path, clock, index, events_tx, file_interner).await;
    }

    index.send_status(StatusUpdate::AllFilesDiscovered).await;

    std::future::pending::<()>().await;
    unreachable!("a pending future never resolves");
}

async fn emit_initial(
    path: &Path,
    clock: &LogicalClock,
    index: &IndexHandle,
    events_tx: &mpsc::UnboundedSender<FileSyncEvent>,
    file_interner: &Interner<String>,
) {
    let fa = FileAddress::from_interned(file_interner.intern(path_to_string(path)));
    let t = clock.tick();

    let sync_event = FileSyncEvent {
        t,
        fa,
        source: EventSource::InitialSync,
        kind: Event::Create,
    };

    if events_tx.send(sync_event).is_err() {
        log::debug!("dropped an initial-sync event for {}: indexer pool has shut down", path.display());
        return;
    }

    index.send_status(StatusUpdate::FileUpdated).await;
}

async fn handle_raw_event(
    raw: notify::Result<notify::Event>,
    clock: &LogicalClock,
    index: &IndexHandle,
    events_tx: &mpsc::UnboundedSender<FileSyncEvent>,
    file_interner: &Interner<String>,
) -> Result<(), Error> {
    let event = raw.map_err(|_| Error::Overflow)?;

    let Some(kind) = map_event_kind(event.kind) else {
        return Ok(());
    };

    for path in &event.paths {
        let fa = FileAddress::from_interned(file_interner.intern(path_to_string(path)));
        let t = clock.tick();

        let sync_event = FileSyncEvent {
            t,
            fa,
            source: EventSource::Watcher,
            kind,
        };

        if events_tx.send(sync_event).is_err() {
            log::debug!("dropped a live event for {}: indexer pool has shut down", path.display());
            continue;
        }

        index.send_status(StatusUpdate::FileUpdated).await;
    }

    Ok(())
}

fn map_event_kind(kind: notify::EventKind) -> Option<Event> {
    match kind {
        notify::EventKind::Create(_) => Some(Event::Create),
        notify::EventKind::Modify(_) => Some(Event::Modify),
        notify::EventKind::Remove(_) => Some(Event::Delete),
        _ => None,
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn walk_once(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "root directory does not exist",
        ));
    }

    let mut paths = Vec::new();

    for entry in ignore::WalkBuilder::new(root).build() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    paths.push(entry.into_path());
                }
            }
            Err(err) => {
                log::debug!("skipping an unreadable path while walking {}: {err}", root.display());
            }
        }
    }

    Ok(paths)
}

fn walk_with_retries(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut last_err = None;

    for attempt in 1..=constant::MAX_WALK_ATTEMPTS {
        match walk_once(root) {
            Ok(paths) => return Ok(paths),
            Err(err) => {
                log::warn!(
                    "initial walk of {} failed on attempt {attempt}/{}: {err}",
                    root.display(),
                    constant::MAX_WALK_ATTEMPTS
                );
                last_err = Some(err);

                if attempt < constant::MAX_WALK_ATTEMPTS {
                    std::thread::sleep(constant::BACKOFF_STEP * (attempt - 1));
                }
            }
        }
    }

    let last_err = last_err.expect("loop always runs at least once");

    if root.exists() {
        Err(Error::WalkFailed(root.to_path_buf(), last_err))
    } else {
        Err(Error::RootNotFound(root.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::config::{Config, Mode};

    use super::*;

    #[tokio::test]
    async fn test_initial_walk_discovers_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "foo bar").unwrap();

        let config = std::sync::Arc::new(Config::new(dir.path().to_path_buf(), Mode::Word));
        let clock = LogicalClock::new();
        let (index, _join) = IndexHandle::spawn(Mode::Word);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let watcher_task = tokio::spawn(run(config, clock, index.clone(), events_tx));

        let mut seen = Vec::new();
        let deadline = tokio::time::sleep(Duration::from_secs(2));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                Some(event) = events_rx.recv() => {
                    seen.push(event.fa.as_str().to_string());
                    if seen.len() == 2 {
                        break;
                    }
                }
                () = &mut deadline => break,
            }
        }

        watcher_task.abort();

        assert_eq!(seen.len(), 2);
        assert!(seen.iter().any(|p| p.ends_with("a.txt")));
        assert!(seen.iter().any(|p| p.ends_with("b.txt")));

        // Drain anything still queued so the stream doesn't linger mid-test.
        drop(events_rx);
    }

    #[tokio::test]
    async fn test_snapshot_only_mode_parks_after_discovery() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let config = std::sync::Arc::new(
            Config::new(dir.path().to_path_buf(), Mode::Word).with_watcher_disabled(),
        );
        let clock = LogicalClock::new();
        let (index, _join) = IndexHandle::spawn(Mode::Word);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let watcher_task = tokio::spawn(run(config, clock, index, events_tx));

        let event = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .expect("event should arrive")
            .expect("channel open");

        assert!(event.fa.as_str().ends_with("a.txt"));

        // The task should still be running (parked), not finished.
        assert!(tokio::time::timeout(Duration::from_millis(100), &mut watcher_task)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_fatal_error_invokes_the_watcher_error_handler() {
        let dir = tempdir().unwrap();
        let missing_root = dir.path().join("does-not-exist");

        let seen: std::sync::Arc<std::sync::Mutex<Option<String>>> =
            std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_in_handler = std::sync::Arc::clone(&seen);

        let config = std::sync::Arc::new(
            Config::new(missing_root, Mode::Word).with_watcher_error_handler(std::sync::Arc::new(
                move |err| {
                    *seen_in_handler.lock().unwrap() = Some(err.to_string());
                },
            )),
        );
        let clock = LogicalClock::new();
        let (index, _join) = IndexHandle::spawn(Mode::Word);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let result = tokio::time::timeout(Duration::from_secs(2), run(config, clock, index, events_tx))
            .await
            .expect("watching a missing root should fail immediately, not hang");

        assert!(result.is_err());
        assert!(seen.lock().unwrap().is_some());
    }
}
