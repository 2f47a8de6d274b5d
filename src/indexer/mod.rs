//! Indexer pool.
//!
//! A fixed number of parallel `tokio` workers drain the watcher's `FileSyncEvent`
//! channel, read and tokenize changed files, and forward [`IndexUpdateRequest`]s to
//! the index actor. `DELETE` events need no I/O and are forwarded directly.
//!
//! Parallelism here is safe because the index actor discards out-of-order results
//! using each event's logical timestamp (see [`crate::index::IndexState`]):
//! whichever worker happens to read and tokenize a file last, the actor reconciles
//! using `t`, not arrival order.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::config::Config;
use crate::index::{IndexHandle, IndexUpdateRequest};
use crate::models::{Event, EventSource, FileSyncEvent};
use crate::tokenizer;

/// Run the fixed-size worker pool for one generation.
///
/// Drains `events_rx` until the watcher drops its sender (the channel closes),
/// which normally only happens when the generation is being torn down. Every
/// per-event I/O failure is swallowed here: a vanished file, a permission error, or
/// an unreadable binary just means that event produces no index update.
pub async fn run(
    config: Arc<Config>,
    events_rx: mpsc::UnboundedReceiver<FileSyncEvent>,
    index: IndexHandle,
) {
    let events_rx = Arc::new(Mutex::new(events_rx));

    let mut workers = Vec::with_capacity(config.worker_count);

    for worker_id in 0..config.worker_count {
        let events_rx = Arc::clone(&events_rx);
        let index = index.clone();
        let config = Arc::clone(&config);

        workers.push(tokio::spawn(async move {
            worker_loop(worker_id, &config, &events_rx, &index).await;
        }));
    }

    for worker in workers {
        let _ = worker.await;
    }

    log::debug!("Indexer pool shutting down: event channel closed");
}

async fn worker_loop(
    worker_id: usize,
    config: &Config,
    events_rx: &Mutex<mpsc::UnboundedReceiver<FileSyncEvent>>,
    index: &IndexHandle,
) {
    loop {
        let event = {
            let mut rx = events_rx.lock().await;
            rx.recv().await
        };

        let Some(event) = event else {
            log::debug!("Indexer worker {worker_id} stopping: event channel closed");
            return;
        };

        handle_event(config, index, event).await;
    }
}

async fn handle_event(config: &Config, index: &IndexHandle, event: FileSyncEvent) {
    match event.kind {
        Event::Delete => {
            index
                .apply_update(IndexUpdateRequest::RemoveFile {
                    t: event.t,
                    fa: event.fa,
                })
                .await;
        }
        Event::Create | Event::Modify => {
            match read_and_tokenize(config, event.fa.as_path()).await {
                Ok(Some(tokens)) => {
                    index
                        .apply_update(IndexUpdateRequest::UpdateFileContent {
                            t: event.t,
                            fa: event.fa,
                            tokens,
                        })
                        .await;
                }
                Ok(None) => {}
                Err(err) => {
                    // A live watcher event hitting the same I/O error is still
                    // swallowed, just without a diagnostic hook, only the initial
                    // walk gets one, since that's the one sync a caller might block on.
                    if event.source == EventSource::InitialSync {
                        if let Some(handler) = &config.handle_initial_file_sync_error {
                            handler(event.fa.as_path(), &err);
                        }
                    }
                }
            }
        }
    }
}

/// Read and tokenize `path`.
///
/// Returns `Ok(None)` for a condition that should be silently skipped without a
/// diagnostic (the file is no longer a regular file, or exceeds the size cap), and
/// `Err` for an I/O failure worth surfacing to `handle_initial_file_sync_error` when
/// the triggering event came from the initial walk. Either way, the caller treats the
/// event as dropped: tokenization failures here are never retried or propagated as a
/// generation error.
async fn read_and_tokenize(config: &Config, path: &Path) -> Result<Option<HashSet<String>>, std::io::Error> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) => {
            log::debug!("Skipping {}: could not stat file: {err}", path.display());
            return Err(err);
        }
    };

    if !metadata.is_file() {
        log::debug!("Skipping {}: no longer a regular file", path.display());
        return Ok(None);
    }

    if metadata.len() > config.max_file_size_bytes {
        log::debug!(
            "Skipping {}: {} bytes exceeds the {} byte cap",
            path.display(),
            metadata.len(),
            config.max_file_size_bytes
        );
        return Ok(None);
    }

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) => {
            log::debug!("Skipping {}: could not read file: {err}", path.display());
            return Err(err);
        }
    };

    Ok(Some(tokenizer::tokenize_content(config.mode, &content)))
}
