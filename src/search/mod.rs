//! Search engine: the public front end for issuing queries against whichever
//! generation the [`crate::supervisor::Supervisor`] currently has running.
//!
//! Candidate generation (via [`crate::index::IndexHandle::find`]) is in-memory and
//! approximate: trigram intersection can admit false positives from character
//! reordering, and the word-mode suffix/prefix heuristics can admit near-matches.
//! Every candidate is re-opened here and its lines re-checked against the query
//! before a [`SearchResult`] is yielded, so those false positives never reach the
//! caller.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::config::Mode;
use crate::logging::trace_enabled;
use crate::models::StatusResult;
use crate::supervisor::Supervisor;
use crate::tokenizer;

/// The size of the rendezvous channel carrying verified matches back to the caller.
///
/// A capacity of 1 means the producer suspends until the caller pulls an item,
/// bounding memory so a slow consumer can't let an unbounded backlog of candidates
/// pile up behind it.
const RESULT_CHANNEL_CAPACITY: usize = 1;

/// One verified match: a line, in a file, that satisfies the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The matched file's path.
    pub path: PathBuf,
    /// 1-based line number of the match within the file.
    pub line_no: usize,
    /// The full content of the matched line.
    pub line: String,
}

/// The outcome of issuing a [`SearchEngine::find`] call.
#[derive(Debug)]
pub struct FindOutcome {
    /// Set if the index was already known to be incomplete (initial sync still in
    /// progress, or broken) before the search began.
    pub initial_warning: Option<String>,
    /// Verified matches, streamed lazily as candidates are opened and checked.
    pub results: ReceiverStream<SearchResult>,
    /// Resolves once the result stream has been fully drained or cancelled.
    ///
    /// Carries a warning if the directory changed mid-search (and `initial_warning`
    /// was not already set, to avoid double-reporting the same condition).
    pub final_warning: oneshot::Receiver<Option<String>>,
}

/// A façade over the currently-running generation's index actor.
///
/// `SearchEngine` never talks to a generation directly; it always asks the
/// supervisor for the current one, so a restart between two calls is invisible to
/// callers beyond an `is_broken` status and briefly empty results.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    supervisor: Supervisor,
    mode: Mode,
    enable_logging: Arc<AtomicBool>,
}

impl SearchEngine {
    /// Build a search engine over `supervisor`, matching/verifying lines under
    /// `mode`.
    #[must_use]
    pub fn new(supervisor: Supervisor, mode: Mode) -> Self {
        let enable_logging = supervisor.enable_logging();
        Self {
            supervisor,
            mode,
            enable_logging,
        }
    }

    /// Proxy a status request to the current generation's index actor, returning
    /// [`StatusResult::broken`] if no generation is currently active.
    pub async fn index_status(&self) -> StatusResult {
        match self.supervisor.current_index() {
            Some(index) => index.status().await,
            None => StatusResult::broken(),
        }
    }

    /// Search for `query`, returning verified, line-level matches.
    ///
    /// Candidates come from the index actor's (approximate) query algorithm; each
    /// is re-read from disk and checked line-by-line before being yielded, so the
    /// stream only ever contains genuine matches.
    pub async fn find(&self, query: String) -> FindOutcome {
        let Some(index) = self.supervisor.current_index() else {
            let (_warn_tx, warn_rx) = oneshot::channel();
            let (_tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

            return FindOutcome {
                initial_warning: Some(incomplete_warning()),
                results: ReceiverStream::new(rx),
                final_warning: warn_rx,
            };
        };

        let initial_status = index.status().await;
        let initial_warning = stale_warning(&initial_status);

        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let (warn_tx, warn_rx) = oneshot::channel();

        let mode = self.mode;
        let had_initial_warning = initial_warning.is_some();
        let enable_logging = Arc::clone(&self.enable_logging);

        tokio::spawn(async move {
            let mut candidates = index.find(query.clone());

            while let Some(candidate) = candidates.next().await {
                if trace_enabled(&enable_logging) {
                    log::trace!("Verifying candidate {candidate} against {query:?}");
                }

                let Some(matches) = read_matches(mode, candidate.as_path(), &query).await else {
                    continue;
                };

                for (line_no, line) in matches {
                    if trace_enabled(&enable_logging) {
                        log::trace!("Matched {candidate}:{line_no}");
                    }

                    let result = SearchResult {
                        path: candidate.as_path().to_path_buf(),
                        line_no,
                        line,
                    };

                    if tx.send(result).await.is_err() {
                        // Consumer dropped the stream: stop producing immediately.
                        let _ = warn_tx.send(None);
                        return;
                    }
                }
            }

            let final_status = index.status().await;
            let changed_warning = if had_initial_warning {
                None
            } else {
                stale_warning(&final_status).map(|_| "directory changed during search".to_string())
            };

            let _ = warn_tx.send(changed_warning);
        });

        FindOutcome {
            initial_warning,
            results: ReceiverStream::new(rx),
            final_warning: warn_rx,
        }
    }
}

/// Re-read `path` and return every `(1-based line number, line content)` pair that
/// matches `query`, or `None` if the file could not be opened, swallowed the same
/// way the indexer pool swallows per-file I/O errors.
async fn read_matches(mode: Mode, path: &std::path::Path, query: &str) -> Option<Vec<(usize, String)>> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(err) => {
            log::debug!("Skipping verification for {}: {err}", path.display());
            return None;
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut matches = Vec::new();
    let mut line_no = 0usize;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                line_no += 1;
                if tokenizer::line_matches(mode, &line, query) {
                    matches.push((line_no, line));
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::debug!("Stopped reading {} during verification: {err}", path.display());
                break;
            }
        }
    }

    Some(matches)
}

fn stale_warning(status: &StatusResult) -> Option<String> {
    if status.is_broken || status.initial_sync_time.is_none() || status.handled != status.total {
        Some(incomplete_warning())
    } else {
        None
    }
}

fn incomplete_warning() -> String {
    "results may be incomplete: the index has not finished its initial sync".to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use tokio_stream::StreamExt;

    use crate::config::Config;

    use super::*;

    #[tokio::test]
    async fn test_find_verifies_and_streams_matches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world\nsecond line").unwrap();

        let config = Config::new(dir.path().to_path_buf(), Mode::Word).with_watcher_disabled();
        let (supervisor, _join) = Supervisor::spawn(config);

        wait_for_sync(&supervisor).await;

        let engine = SearchEngine::new(supervisor, Mode::Word);
        let outcome = engine.find("hello".to_string()).await;

        let results: Vec<SearchResult> = outcome.results.collect().await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line_no, 1);
        assert_eq!(results[0].line, "hello world");
    }

    #[tokio::test]
    async fn test_find_with_no_active_generation_reports_incomplete() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf(), Mode::Word);
        let (supervisor, join) = Supervisor::spawn(config);
        supervisor.shutdown();
        let _ = join.await;

        let engine = SearchEngine::new(supervisor, Mode::Word);
        let outcome = engine.find("anything".to_string()).await;

        assert!(outcome.initial_warning.is_some());

        let results: Vec<SearchResult> = outcome.results.collect().await;
        assert!(results.is_empty());
    }

    async fn wait_for_sync(supervisor: &Supervisor) {
        for _ in 0..200 {
            let status = match supervisor.current_index() {
                Some(index) => index.status().await,
                None => {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    continue;
                }
            };

            if status.initial_sync_time.is_some() {
                return;
            }

            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        panic!("initial sync never completed");
    }
}
