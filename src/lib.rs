#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # grepd
//!
//! A live, in-memory full-text search index over a directory tree.
//!
//! `grepd` walks a directory once, then watches it for changes, continuously
//! reflecting creates, modifies, and deletes into an in-memory inverted index. Callers
//! issue substring queries and get back matching files, line numbers, and matched text.
//!
//! Two tokenization strategies are selectable at startup via [`config::Mode`]:
//!
//! - **Word mode** tokenizes on runs of alphanumeric characters.
//! - **Trigram mode** tokenizes every 3-character sliding window of a line.
//!
//! Both strategies shape indexing and query-time candidate filtering identically, but
//! trade off differently between recall, memory, and resilience to partial-word
//! queries.
//!
//! ## Architecture
//!
//! Five components form a staged pipeline, connected by message queues:
//!
//! 1. [`watcher`]: walks the tree once, then subscribes to filesystem events.
//! 2. [`indexer`]: a pool of workers that read and tokenize changed files.
//! 3. [`index`]: a single-owner actor holding the forward/reverse indexes.
//! 4. [`supervisor`]: launches the above as one generation, and restarts on failure.
//! 5. [`search`]: answers queries, verifying index candidates against the live file.
//!
//! This crate does not implement a command shell, persistence, or ranking: the index
//! is an unranked, volatile, rebuilt-on-every-start structure, and any user-facing
//! front end (REPL, LSP, etc.) is expected to be layered on top of [`search::SearchEngine`]
//! and [`supervisor::Supervisor`].

pub mod clock;
pub mod config;
pub mod index;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod search;
pub mod supervisor;
pub mod tokenizer;
pub mod watcher;
