use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

/// A concurrent interner which deduplicates owned strings into shared, cheaply
/// cloneable handles.
///
/// Two calls to [`Interner::intern`] with equal content return `Arc`s which point at
/// the same allocation, so callers can compare handles by [`Arc::ptr_eq`] instead of
/// comparing string content.
///
/// This does not implement weak-keyed garbage collection: entries are retained for
/// the lifetime of the interner once referenced, and it is the caller's
/// responsibility to prune no-longer-useful entries (the index actor does this for
/// [`Token`](crate::models::Token) by removing now-empty reverse-index buckets on
/// every `RemoveFile`).
#[derive(Debug)]
pub struct Interner<K> {
    entries: DashMap<Arc<K>, ()>,
}

impl<K> Default for Interner<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K> Interner<K>
where
    K: Eq + Hash,
{
    /// Intern a value, returning the shared handle for it.
    ///
    /// If an equal value has already been interned, the existing handle is returned
    /// and `value` is dropped.
    pub fn intern(&self, value: K) -> Arc<K> {
        if let Some(entry) = self.entries.get(&value) {
            return Arc::clone(entry.key());
        }

        let handle = Arc::new(value);
        self.entries.insert(Arc::clone(&handle), ());

        handle
    }

    /// The number of distinct values currently interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the interner currently holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Interner;

    #[test]
    fn test_interning_equal_values_returns_same_handle() {
        let interner = Interner::default();

        let a = interner.intern("hello".to_string());
        let b = interner.intern("hello".to_string());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_interning_distinct_values_returns_distinct_handles() {
        let interner = Interner::default();

        let a = interner.intern("hello".to_string());
        let b = interner.intern("world".to_string());

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }
}
