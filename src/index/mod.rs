//! The index actor.
//!
//! A single `tokio` task owns [`state::IndexState`] (the forward/reverse maps, the
//! per-file update times, and the status counters) behind one inbox that
//! multiplexes status signals, index-update requests, and user requests. Nothing
//! else ever touches the maps, so no locking is needed.

mod messages;
mod query;
mod state;

pub use messages::{IndexUpdateRequest, UserRequest};
pub use state::IndexState;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::ReceiverStream;

use crate::config::Mode;
use crate::models::{FileAddress, IndexStateUpdate, StatusResult, StatusUpdate};
use messages::Message;

/// The size of the actor's inbox.
///
/// Status updates and index-update requests are produced by bounded/unbounded
/// upstream channels already; the inbox itself just
/// needs enough slack that a burst of status signals during initial sync doesn't
/// stall the sender.
const INBOX_CAPACITY: usize = 1024;

/// A cheap, cloneable handle to a running index actor.
///
/// Every clone shares the same underlying `tokio::mpsc` sender, so handing a clone to
/// the indexer pool, the watcher, and a search engine all route through the same
/// single-owner actor.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    tx: mpsc::Sender<Message>,
    state_rx: watch::Receiver<IndexStateUpdate>,
}

impl IndexHandle {
    /// Spawn a new index actor for the given tokenization mode, returning a handle to
    /// it and the `tokio` task that's now running it.
    #[must_use]
    pub fn spawn(mode: Mode) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let (state_tx, state_rx) = watch::channel(IndexStateUpdate::Initial);

        let join_handle = tokio::spawn(run(rx, mode, state_tx));

        (Self { tx, state_rx }, join_handle)
    }

    /// Subscribe to this generation's lifecycle transitions (`WatcherStarted`,
    /// `AllFilesDiscovered`, `InitialFileSyncCompleted`), as they're derived from
    /// the counters this actor owns.
    ///
    /// The supervisor wraps this with its own `Initializing`/`IndexFailed`/
    /// `Restarting`/`Terminated` transitions to produce the full status stream
    /// observers see.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<IndexStateUpdate> {
        self.state_rx.clone()
    }

    /// Forward a status signal into the actor's inbox.
    ///
    /// Status signals have no response and no cancellation semantics, so a failed
    /// send (the actor has already shut down) is simply logged.
    pub async fn send_status(&self, update: StatusUpdate) {
        if self.tx.send(Message::Status(update)).await.is_err() {
            log::debug!("Dropped status update, index actor has already shut down");
        }
    }

    /// Apply an index-update request.
    pub async fn apply_update(&self, request: IndexUpdateRequest) {
        if self.tx.send(Message::Update(request)).await.is_err() {
            log::debug!("Dropped index update, index actor has already shut down");
        }
    }

    /// Snapshot the current status counters.
    ///
    /// If the actor's inbox is closed or the request is otherwise lost in flight,
    /// this falls back to [`StatusResult::broken`] rather than hanging.
    pub async fn status(&self) -> StatusResult {
        let (respond_to, response) = oneshot::channel();

        if self
            .tx
            .send(Message::User(UserRequest::Status(respond_to)))
            .await
            .is_err()
        {
            log::warn!("Status request lost: index actor inbox is closed");
            return StatusResult::broken();
        }

        response.await.unwrap_or_else(|_| StatusResult::broken())
    }

    /// Stream every candidate file for `query`, in unverified, deduplicated order.
    ///
    /// The returned stream is backed by a rendezvous channel: dropping it cancels
    /// the producer as soon as it next tries to emit an item.
    #[must_use]
    pub fn find(&self, query: String) -> ReceiverStream<FileAddress> {
        let (respond_to, candidates) = mpsc::channel(1);

        let tx = self.tx.clone();

        tokio::spawn(async move {
            let request = Message::User(UserRequest::Find { query, respond_to });

            if let Err(err) = tx.send(request).await {
                // The actor is gone; dropping `respond_to` here (via the returned
                // message) closes the stream immediately, which is how a `FindRequest`
                // reports cancellation.
                drop(err);
                log::warn!("Find request lost: index actor inbox is closed");
            }
        });

        ReceiverStream::new(candidates)
    }
}

async fn run(mut inbox: mpsc::Receiver<Message>, mode: Mode, state_tx: watch::Sender<IndexStateUpdate>) {
    let mut state = IndexState::new(mode);

    log::debug!("Index actor started in {mode} mode");

    while let Some(message) = inbox.recv().await {
        match message {
            Message::Status(update) => state.apply_status(update),
            Message::Update(IndexUpdateRequest::UpdateFileContent { t, fa, tokens }) => {
                state.apply_update_file_content(t, fa, tokens);
            }
            Message::Update(IndexUpdateRequest::RemoveFile { t, fa }) => {
                state.apply_remove_file(t, fa);
            }
            Message::User(UserRequest::Status(respond_to)) => {
                let _ = respond_to.send(state.status());
            }
            Message::User(UserRequest::Find { query, respond_to }) => {
                // Snapshotting only clones the map structure (cheap Arc bumps on
                // already-interned addresses/tokens), so this stays non-suspending.
                // The actual scan, the expensive part, runs in the spawned task
                // below, off the actor's critical section, and checks in with
                // `respond_to` between filter stages so a cancelled consumer stops
                // it promptly instead of it running to completion.
                let snapshot = state.snapshot();

                tokio::spawn(async move {
                    query::run(&snapshot, &query, &respond_to).await;
                });
            }
        }

        for transition in state.take_transitions() {
            let _ = state_tx.send(transition);
        }
    }

    log::debug!("Index actor inbox closed, shutting down");
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use crate::config::Mode;
    use crate::models::FileAddress;

    use super::*;

    #[tokio::test]
    async fn test_status_is_broken_after_actor_shuts_down() {
        let (handle, join_handle) = IndexHandle::spawn(Mode::Word);

        join_handle.abort();
        // Give the aborted task a moment to actually unwind and drop its receiver.
        tokio::task::yield_now().await;

        let status = handle.status().await;

        assert!(status.is_broken);
    }

    #[tokio::test]
    async fn test_find_streams_candidates_end_to_end() {
        let (handle, _join) = IndexHandle::spawn(Mode::Word);

        handle
            .apply_update(IndexUpdateRequest::UpdateFileContent {
                t: 1,
                fa: test_file_address("/a.txt"),
                tokens: ["hello", "world"].into_iter().map(String::from).collect(),
            })
            .await;

        let results: Vec<FileAddress> = handle.find("hello".to_string()).collect().await;

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_indexed_files() {
        let (handle, _join) = IndexHandle::spawn(Mode::Word);

        handle
            .apply_update(IndexUpdateRequest::UpdateFileContent {
                t: 1,
                fa: test_file_address("/a.txt"),
                tokens: ["hello"].into_iter().map(String::from).collect(),
            })
            .await;

        let status = handle.status().await;

        assert_eq!(status.indexed_files, 1);
        assert!(!status.is_broken);
    }

    #[tokio::test]
    async fn test_watcher_started_status_publishes_a_state_transition() {
        let (handle, _join) = IndexHandle::spawn(Mode::Word);
        let mut state_rx = handle.subscribe_state();

        handle.send_status(StatusUpdate::WatcherStarted).await;

        state_rx.changed().await.expect("actor is still running");
        assert!(matches!(
            *state_rx.borrow(),
            crate::models::IndexStateUpdate::WatcherStarted(_)
        ));
    }

    fn test_file_address(path: &str) -> FileAddress {
        let interner = crate::models::Interner::default();
        FileAddress::from_interned(interner.intern(path.to_string()))
    }
}
