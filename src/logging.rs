//! Runtime-toggleable trace logging gate.
//!
//! The flag is a plain `Arc<AtomicBool>`, shared between [`crate::config::Config`]
//! and every component that wants to check it before emitting a `log::trace!` at a
//! hot, per-item call site (per-candidate during a search, per-line during
//! verification). It never gates `debug!`/`warn!`/`error!`, which already fire rarely
//! enough to leave on unconditionally; only the high-volume `trace!` sites check it.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether trace-level logging is currently enabled.
#[must_use]
pub fn trace_enabled(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::trace_enabled;

    #[test]
    fn test_trace_enabled_reflects_the_flag() {
        let flag = AtomicBool::new(false);
        assert!(!trace_enabled(&flag));

        flag.store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(trace_enabled(&flag));
    }
}
