//! String interning for attribute keys
//!
//! Composite attribute keys such as `size$hgi$alice$bam` recur across
//! millions of node payload maps. Interning stores one backing copy of each
//! key and hands out dense integer ids, so a payload entry is an id plus a
//! tagged scalar instead of an owned string.
//!
//! # Thread safety
//!
//! The interner is written only while the tree is being built, from a
//! single thread. After finalization it is published together with the
//! tree and serves concurrent readers, which take the read lock only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Dense identifier for an interned attribute key.
pub type KeyId = u64;

/// Bidirectional map between attribute-key strings and dense ids.
///
/// Ids are assigned monotonically from 0 and are stable for the life of
/// the process. They are not required to be reproducible across runs.
#[derive(Debug, Default)]
pub struct StringInterner {
    /// Forward map: string -> id
    string_to_id: RwLock<HashMap<String, KeyId>>,

    /// Reverse map: id -> string, indexed by id
    id_to_string: RwLock<Vec<String>>,

    /// Next id to assign
    next_id: AtomicU64,
}

impl StringInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-allocated capacity for `capacity` distinct keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            string_to_id: RwLock::new(HashMap::with_capacity(capacity)),
            id_to_string: RwLock::new(Vec::with_capacity(capacity)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Intern a string, returning its id.
    ///
    /// Returns the existing id when the string is already interned. The
    /// fast path takes only the read lock; the insert path re-checks under
    /// the write lock.
    pub fn intern(&self, s: &str) -> KeyId {
        {
            let map = self.string_to_id.read();
            if let Some(&id) = map.get(s) {
                return id;
            }
        }

        let mut map = self.string_to_id.write();
        if let Some(&id) = map.get(s) {
            return id;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        map.insert(s.to_string(), id);

        let mut reverse = self.id_to_string.write();
        debug_assert_eq!(reverse.len() as u64, id);
        reverse.push(s.to_string());

        id
    }

    /// Get the id for a string without interning it.
    pub fn get_id(&self, s: &str) -> Option<KeyId> {
        self.string_to_id.read().get(s).copied()
    }

    /// Resolve an id back to its string.
    pub fn resolve(&self, id: KeyId) -> Option<String> {
        self.id_to_string.read().get(id as usize).cloned()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.id_to_string.read().len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_stable_ids() {
        let interner = StringInterner::new();

        let a = interner.intern("size$*$*$*");
        let b = interner.intern("count$*$*$*");
        let a2 = interner.intern("size$*$*$*");

        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip() {
        let interner = StringInterner::new();
        let keys = ["size$*$*$*", "count$hgi$alice$bam", "atime$*$bob$file"];

        for key in keys {
            let id = interner.intern(key);
            assert_eq!(interner.resolve(id).as_deref(), Some(key));
            assert_eq!(interner.intern(&interner.resolve(id).unwrap()), id);
        }
        assert_eq!(interner.len(), keys.len());
    }

    #[test]
    fn test_monotonic_from_zero() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern("a"), 0);
        assert_eq!(interner.intern("b"), 1);
        assert_eq!(interner.intern("c"), 2);
    }

    #[test]
    fn test_unknown_lookups() {
        let interner = StringInterner::new();
        interner.intern("present");
        assert_eq!(interner.get_id("absent"), None);
        assert_eq!(interner.resolve(99), None);
    }
}
