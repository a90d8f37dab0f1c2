//! Interned model strings
//!
//! Property names and string values are immutable and interned for
//! deduplication, which makes equality checks cheap (hash, then pointer-equal
//! data in the common case).

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Global string intern table
static STRING_TABLE: std::sync::LazyLock<DashMap<u64, Arc<ScriptString>>> =
    std::sync::LazyLock::new(DashMap::new);

/// An interned, immutable string value.
pub struct ScriptString {
    /// The actual string data
    data: Arc<str>,
    /// Precomputed hash for fast lookup
    hash: u64,
}

impl ScriptString {
    /// Create or retrieve an interned string.
    pub fn intern(s: &str) -> Arc<Self> {
        let hash = Self::compute_hash(s);

        if let Some(existing) = STRING_TABLE.get(&hash) {
            if existing.data.as_ref() == s {
                return existing.clone();
            }
            // Hash collision: hand out an uninterned copy rather than evict.
            return Arc::new(Self {
                data: Arc::from(s),
                hash,
            });
        }

        let interned = Arc::new(Self {
            data: Arc::from(s),
            hash,
        });
        STRING_TABLE.insert(hash, interned.clone());
        interned
    }

    /// Borrow the string data.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn compute_hash(s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for ScriptString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.data == other.data
    }
}

impl Eq for ScriptString {}

impl Hash for ScriptString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for ScriptString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScriptString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.data.cmp(&other.data)
    }
}

impl fmt::Display for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl fmt::Debug for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_deduplicates() {
        let a = ScriptString::intern("shared name");
        let b = ScriptString::intern("shared name");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.as_str(), "shared name");
    }

    #[test]
    fn test_distinct_strings_differ() {
        let a = ScriptString::intern("alpha");
        let b = ScriptString::intern("beta");
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_display_and_len() {
        let s = ScriptString::intern("abc");
        assert_eq!(s.to_string(), "abc");
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
    }
}
