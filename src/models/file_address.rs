use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A normalized, absolute path, interned so that two events referring to the same file
/// share one allocation.
///
/// `FileAddress` is cheap to clone (an `Arc` bump) and is compared, hashed, and keyed
/// by identity of the underlying allocation rather than by string content: two
/// `FileAddress` values are only ever `==` if they were produced by interning the same
/// path through the same [`Interner`](crate::models::Interner).
#[derive(Debug, Clone)]
pub struct FileAddress(Arc<String>);

impl FileAddress {
    /// Wrap an already-interned path handle.
    ///
    /// Callers should generally go through `Interner<String>::intern` and wrap the
    /// result, rather than constructing this directly, so that identity comparisons
    /// stay meaningful.
    #[must_use]
    pub fn from_interned(path: Arc<String>) -> Self {
        Self(path)
    }

    /// The normalized absolute path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized absolute path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }
}

impl PartialEq for FileAddress {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for FileAddress {}

impl std::hash::Hash for FileAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Display for FileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Interner;

    use super::FileAddress;

    #[test]
    fn test_equal_paths_interned_together_compare_equal() {
        let interner: Interner<String> = Interner::default();

        let a = FileAddress::from_interned(interner.intern("/a.txt".to_string()));
        let b = FileAddress::from_interned(interner.intern("/a.txt".to_string()));

        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_paths_compare_unequal() {
        let interner: Interner<String> = Interner::default();

        let a = FileAddress::from_interned(interner.intern("/a.txt".to_string()));
        let b = FileAddress::from_interned(interner.intern("/b.txt".to_string()));

        assert_ne!(a, b);
    }
}
