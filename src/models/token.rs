use std::fmt;
use std::sync::Arc;

/// A lowercased, interned fragment of file content.
///
/// In word mode, a token is a run of alphanumeric characters. In trigram mode, a
/// token is a fixed-length 3-character window of a line. Either way, tokens are
/// interned per-process (see [`crate::models::Interner`]) to cap memory, and compared
/// by identity rather than content.
#[derive(Debug, Clone)]
pub struct Token(Arc<String>);

impl Token {
    /// Wrap an already-interned token handle.
    #[must_use]
    pub fn from_interned(token: Arc<String>) -> Self {
        Self(token)
    }

    /// The token's text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Interner;

    use super::Token;

    #[test]
    fn test_equal_tokens_interned_together_compare_equal() {
        let interner: Interner<String> = Interner::default();

        let a = Token::from_interned(interner.intern("hello".to_string()));
        let b = Token::from_interned(interner.intern("hello".to_string()));

        assert_eq!(a, b);
    }
}
