//! The candidate-generation algorithms for both tokenization modes.
//!
//! A query runs against an [`IndexSnapshot`] (a cheap, owned copy of the maps taken
//! by the actor before it spawns this scan into its own task, see
//! [`crate::index::IndexHandle::find`]) rather than `IndexState` directly, and
//! streams candidates straight to the caller's channel instead of materializing a
//! `Vec` first. This is what lets a large scan run off the actor's critical section
//! and still be cancelled mid-scan: every loop here checks [`still_wanted`] between
//! filter stages and emitted candidates, so a consumer that's gone away stops the
//! scan promptly instead of running it to completion.

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::models::FileAddress;
use crate::tokenizer;

use super::state::IndexSnapshot;

/// How many loop iterations a scan performs between cooperative liveness checks.
const LIVENESS_CHECK_INTERVAL: usize = 256;

/// Run a query against `snapshot`, streaming deduplicated candidates to `tx` as
/// they're found. Returns once the scan is complete or the consumer has gone away.
pub async fn run(snapshot: &IndexSnapshot, query: &str, tx: &mpsc::Sender<FileAddress>) {
    match snapshot.mode {
        crate::config::Mode::Word => word_query(snapshot, query, tx).await,
        crate::config::Mode::Trigram => trigram_query(snapshot, query, tx).await,
    }
}

async fn word_query(snapshot: &IndexSnapshot, query: &str, tx: &mpsc::Sender<FileAddress>) {
    let tokens = tokenizer::tokenize_word_query(query);

    match tokens.len() {
        0 => emit_all(tx, &mut HashSet::new(), snapshot.forward.keys()).await,
        1 => word_query_single(snapshot, &tokens[0], tx).await,
        2 => word_query_pair(snapshot, &tokens[0], &tokens[1], tx).await,
        n => word_query_many(snapshot, &tokens, n, tx).await,
    }
}

async fn word_query_single(snapshot: &IndexSnapshot, q: &str, tx: &mpsc::Sender<FileAddress>) {
    let mut seen = HashSet::new();

    if let Some(files) = exact_bucket(snapshot, q) {
        if !emit_all(tx, &mut seen, files.iter()).await {
            return;
        }
    }

    for (i, (token, files)) in substring_buckets(snapshot, q).enumerate() {
        if !still_wanted(tx, i).await {
            return;
        }
        if token == q {
            // Already streamed as the exact match above.
            continue;
        }
        if !emit_all(tx, &mut seen, files.iter()).await {
            return;
        }
    }
}

/// The two-token word query is intentionally asymmetric: a file qualifies via either
/// direction of "exact start, fuzzy end" / "exact end, fuzzy start", or via a "fuzzy
/// both ends" fallback (clause iii below) that catches files with no exact token at
/// all, e.g. "food bark" for the query "foo bar". This mirrors the source's real
/// behavior and is preserved rather than "fixed".
async fn word_query_pair(snapshot: &IndexSnapshot, s: &str, e: &str, tx: &mpsc::Sender<FileAddress>) {
    let mut seen = HashSet::new();

    // (i) contains `s` exactly, and contains `e` or a token starting with `e`.
    if let Some(s_files) = exact_bucket(snapshot, s) {
        for (i, fa) in s_files.iter().enumerate() {
            if !still_wanted(tx, i).await {
                return;
            }
            if forward_contains_exact_or_prefix(snapshot, fa, e, Direction::Prefix)
                && !emit(tx, &mut seen, fa).await
            {
                return;
            }
        }
    }

    // (ii) contains `e` exactly, and contains `s` or a token ending with `s`.
    if let Some(e_files) = exact_bucket(snapshot, e) {
        for (i, fa) in e_files.iter().enumerate() {
            if !still_wanted(tx, i).await {
                return;
            }
            if forward_contains_exact_or_prefix(snapshot, fa, s, Direction::Suffix)
                && !emit(tx, &mut seen, fa).await
            {
                return;
            }
        }
    }

    // (iii) contains a token starting with `s` AND a token starting with `e`: catches
    // files like "food bark" for the query "foo bar", where neither token appears
    // verbatim in either direction.
    for (i, (fa, tokens)) in snapshot.forward.iter().enumerate() {
        if !still_wanted(tx, i).await {
            return;
        }

        let has_prefix_s = tokens.iter().any(|t| t.as_str().starts_with(s));
        let has_prefix_e = tokens.iter().any(|t| t.as_str().starts_with(e));

        if has_prefix_s && has_prefix_e && !emit(tx, &mut seen, fa).await {
            return;
        }
    }
}

enum Direction {
    Prefix,
    Suffix,
}

fn forward_contains_exact_or_prefix(
    snapshot: &IndexSnapshot,
    fa: &FileAddress,
    token: &str,
    direction: Direction,
) -> bool {
    let Some(tokens) = snapshot.forward.get(fa) else {
        return false;
    };

    tokens.iter().any(|t| {
        t.as_str() == token
            || match direction {
                Direction::Prefix => t.as_str().starts_with(token),
                Direction::Suffix => t.as_str().ends_with(token),
            }
    })
}

async fn word_query_many(
    snapshot: &IndexSnapshot,
    tokens: &[String],
    n: usize,
    tx: &mpsc::Sender<FileAddress>,
) {
    let s = &tokens[0];
    let e = &tokens[n - 1];
    let core = &tokens[1..n - 1];

    let Some(smallest_core) = core
        .iter()
        .filter_map(|c| exact_bucket(snapshot, c).map(|files| (c, files)))
        .min_by_key(|(_, files)| files.len())
    else {
        return;
    };

    let mut seen = HashSet::new();

    for (i, fa) in smallest_core.1.iter().enumerate() {
        if !still_wanted(tx, i).await {
            return;
        }

        let Some(file_tokens) = snapshot.forward.get(fa) else {
            continue;
        };

        let has_every_core = core
            .iter()
            .all(|c| file_tokens.iter().any(|t| t.as_str() == c.as_str()));
        let has_start = file_tokens
            .iter()
            .any(|t| t.as_str() == s.as_str() || t.as_str().ends_with(s.as_str()));
        let has_end = file_tokens
            .iter()
            .any(|t| t.as_str() == e.as_str() || t.as_str().starts_with(e.as_str()));

        if has_every_core && has_start && has_end && !emit(tx, &mut seen, fa).await {
            return;
        }
    }
}

async fn trigram_query(snapshot: &IndexSnapshot, query: &str, tx: &mpsc::Sender<FileAddress>) {
    let lowered = query.to_lowercase();

    match lowered.chars().count() {
        0 => emit_all(tx, &mut HashSet::new(), snapshot.forward.keys()).await,
        1 | 2 => {
            let mut seen = HashSet::new();

            for (i, (_, files)) in substring_buckets(snapshot, &lowered).enumerate() {
                if !still_wanted(tx, i).await {
                    return;
                }
                if !emit_all(tx, &mut seen, files.iter()).await {
                    return;
                }
            }
        }
        _ => trigram_intersection(snapshot, &lowered, tx).await,
    }
}

async fn trigram_intersection(snapshot: &IndexSnapshot, query: &str, tx: &mpsc::Sender<FileAddress>) {
    let trigrams = tokenizer::trigrams_of_query(query);

    let mut candidates: Option<HashSet<FileAddress>> = None;

    for (i, trigram) in trigrams.iter().enumerate() {
        if !still_wanted(tx, i).await {
            return;
        }

        let bucket = exact_bucket(snapshot, trigram);

        let next: HashSet<FileAddress> = match (candidates, bucket) {
            (None, Some(bucket)) => bucket.clone(),
            (None, Option::None) => HashSet::new(),
            (Some(prev), Some(bucket)) => prev.intersection(bucket).cloned().collect(),
            (Some(_), Option::None) => HashSet::new(),
        };

        if next.is_empty() {
            return;
        }

        candidates = Some(next);
    }

    if let Some(candidates) = candidates {
        emit_all(tx, &mut HashSet::new(), candidates.iter()).await;
    }
}

fn exact_bucket<'a>(snapshot: &'a IndexSnapshot, token: &str) -> Option<&'a HashSet<FileAddress>> {
    snapshot
        .reverse
        .iter()
        .find(|(t, _)| t.as_str() == token)
        .map(|(_, files)| files)
}

fn substring_buckets<'a>(
    snapshot: &'a IndexSnapshot,
    needle: &'a str,
) -> impl Iterator<Item = (&'a str, &'a HashSet<FileAddress>)> {
    snapshot
        .reverse
        .iter()
        .filter(move |(t, _)| t.as_str().contains(needle))
        .map(|(t, files)| (t.as_str(), files))
}

/// Check whether the consumer is still listening, yielding to the runtime every
/// `LIVENESS_CHECK_INTERVAL` iterations so one large scan can't monopolize the
/// actor's executor thread between checks.
async fn still_wanted(tx: &mpsc::Sender<FileAddress>, i: usize) -> bool {
    if tx.is_closed() {
        return false;
    }
    if i % LIVENESS_CHECK_INTERVAL == 0 {
        tokio::task::yield_now().await;
    }
    true
}

/// Send `fa` if it hasn't already been emitted this query. Returns `false` once the
/// consumer has gone away, signalling the caller to stop scanning.
async fn emit(tx: &mpsc::Sender<FileAddress>, seen: &mut HashSet<FileAddress>, fa: &FileAddress) -> bool {
    if !seen.insert(fa.clone()) {
        return true;
    }
    tx.send(fa.clone()).await.is_ok()
}

async fn emit_all<'a>(
    tx: &mpsc::Sender<FileAddress>,
    seen: &mut HashSet<FileAddress>,
    files: impl Iterator<Item = &'a FileAddress>,
) -> bool {
    for (i, fa) in files.enumerate() {
        if !still_wanted(tx, i).await {
            return false;
        }
        if !emit(tx, seen, fa).await {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::config::Mode;
    use crate::models::Interner;

    use super::super::state::IndexState;

    use super::*;

    /// Build an index by tokenizing `content` the same way the indexer pool would
    /// for each `(path, content)` pair, rather than inserting hand-picked tokens.
    fn index_with(mode: Mode, files: &[(&str, &str)]) -> (IndexSnapshot, Interner<String>) {
        let interner = Interner::default();
        let mut state = IndexState::new(mode);

        for (t, (path, content)) in files.iter().enumerate() {
            let fa = FileAddress::from_interned(interner.intern((*path).to_string()));
            let tokens = crate::tokenizer::tokenize_content(mode, content);
            state.apply_update_file_content(t as u64 + 1, fa, tokens);
        }

        (state.snapshot(), interner)
    }

    async fn run_to_vec(snapshot: &IndexSnapshot, query: &str) -> Vec<FileAddress> {
        let (tx, mut rx) = mpsc::channel(16);

        run(snapshot, query, &tx).await;
        drop(tx);

        let mut out = Vec::new();
        while let Some(fa) = rx.recv().await {
            out.push(fa);
        }
        out
    }

    #[tokio::test]
    async fn test_word_mode_single_token() {
        let (snapshot, _interner) = index_with(Mode::Word, &[("/a.txt", "hello world")]);

        let results = run_to_vec(&snapshot, "hello").await;
        assert_eq!(results.len(), 1);

        let results = run_to_vec(&snapshot, "xyz").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_word_mode_two_tokens_asymmetric_match() {
        let (snapshot, _interner) = index_with(
            Mode::Word,
            &[("/a.txt", "foo bar"), ("/b.txt", "food bark")],
        );

        let results = run_to_vec(&snapshot, "foo bar").await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_word_mode_empty_query_returns_every_file() {
        let (snapshot, _interner) =
            index_with(Mode::Word, &[("/a.txt", "foo"), ("/b.txt", "bar")]);

        assert_eq!(run_to_vec(&snapshot, "").await.len(), 2);
    }

    #[tokio::test]
    async fn test_trigram_mode_short_query_substring_over_tokens() {
        let (snapshot, _interner) = index_with(Mode::Trigram, &[("/a.txt", "abcdef")]);

        let results = run_to_vec(&snapshot, "cd").await;
        assert_eq!(results.len(), 1);

        let results = run_to_vec(&snapshot, "xy").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_trigram_mode_intersection_excludes_non_matching_files() {
        let (snapshot, _interner) = index_with(
            Mode::Trigram,
            &[
                ("/a.txt", "the quick brown fox"),
                ("/b.txt", "the slow cat"),
            ],
        );

        let results = run_to_vec(&snapshot, "quick").await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_stops_once_the_consumer_is_gone() {
        let files: Vec<(String, String)> = (0..2000)
            .map(|i| (format!("/f{i}.txt"), "foo bar".to_string()))
            .collect();
        let files_ref: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        let (snapshot, _interner) = index_with(Mode::Word, &files_ref);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        // The consumer is already gone; the scan must stop promptly rather than
        // running to completion and failing to send every candidate.
        run(&snapshot, "foo bar", &tx).await;
    }
}
