//! Per-node attribute payload
//!
//! An `IndexedMap` is the unit of aggregation: one is built per input
//! record, one lives in every tree node, and combining them is what rolls
//! statistics up the directory hierarchy. Keys are interned ids, never
//! strings; the string form only reappears when a map is exported as JSON.
//!
//! Composite keys have four `$`-separated components,
//! `dataType$group$user$property`, and the nested JSON export mirrors that
//! structure as `{dataType: {group: {user: {property: value}}}}`.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::datum::Datum;
use crate::intern::{KeyId, StringInterner};

/// Number of `$`-separated components in a well-formed attribute key.
const KEY_COMPONENTS: usize = 4;

/// Map from interned attribute-key id to accumulator.
///
/// Never holds zero-valued entries after a mutating operation returns:
/// `subtract` prunes entries that reach zero (exactly for integers, within
/// [`crate::datum::FLOAT_ZERO_EPSILON`] for floats).
#[derive(Debug, Clone, Default)]
pub struct IndexedMap {
    entries: HashMap<KeyId, Datum>,
}

impl IndexedMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `key` and fold `value` in: insert when absent, add when
    /// present.
    pub fn add_item(&mut self, interner: &StringInterner, key: &str, value: Datum) {
        let id = interner.intern(key);
        self.add_item_by_id(id, value);
    }

    /// Fold `value` in under an already-interned id.
    pub fn add_item_by_id(&mut self, id: KeyId, value: Datum) {
        self.entries
            .entry(id)
            .and_modify(|d| d.add(&value))
            .or_insert(value);
    }

    /// Pointwise add `other` into self, copying entries absent from self.
    pub fn combine(&mut self, other: &IndexedMap) {
        for (&id, datum) in &other.entries {
            self.add_item_by_id(id, *datum);
        }
    }

    /// Pointwise subtract `other` from self over the shared ids, removing
    /// entries whose result is zero.
    pub fn subtract(&mut self, other: &IndexedMap) {
        let mut drained = Vec::new();
        for (&id, datum) in &mut self.entries {
            if let Some(other_datum) = other.entries.get(&id) {
                datum.sub(other_datum);
                if datum.is_zero() {
                    drained.push(id);
                }
            }
        }
        for id in drained {
            self.entries.remove(&id);
        }
    }

    /// Fetch the accumulator for an interned id.
    pub fn get(&self, id: KeyId) -> Option<&Datum> {
        self.entries.get(&id)
    }

    /// Fetch the accumulator for a key string without interning it.
    pub fn get_by_key(&self, interner: &StringInterner, key: &str) -> Option<&Datum> {
        interner.get_id(key).and_then(|id| self.entries.get(&id))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(id, datum)` pairs. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (KeyId, &Datum)> {
        self.entries.iter().map(|(&id, d)| (id, d))
    }

    /// Export as the nested `{dataType: {group: {user: {property: value}}}}`
    /// object.
    ///
    /// Keys that do not decompose into exactly four components are skipped
    /// with a warning; emitting them in some improvised position would
    /// corrupt the shape consumers navigate by.
    pub fn to_json_nested(&self, interner: &StringInterner) -> Value {
        let mut root = Map::new();
        for (&id, datum) in &self.entries {
            let Some(key) = interner.resolve(id) else {
                warn!(id, "attribute id missing from interner, skipping");
                continue;
            };
            let parts: Vec<&str> = key.split('$').collect();
            let &[data_type, group, user, property] = parts.as_slice() else {
                warn!(
                    key = %key,
                    components = parts.len(),
                    expected = KEY_COMPONENTS,
                    "malformed attribute key, skipping in nested export"
                );
                continue;
            };
            let by_group = child_object(&mut root, data_type);
            let by_user = child_object(by_group, group);
            let by_property = child_object(by_user, user);
            by_property.insert(property.to_string(), datum.to_json_value());
        }
        Value::Object(root)
    }

    /// Export a single entry as a flat `{key: value}` object, regardless of
    /// how many components the key has. Empty object when the key is not
    /// present.
    pub fn to_json_single(&self, interner: &StringInterner, key: &str) -> Value {
        let mut out = Map::new();
        if let Some(datum) = self.get_by_key(interner, key) {
            out.insert(key.to_string(), datum.to_json_value());
        }
        Value::Object(out)
    }
}

/// Descend into (creating if needed) the object-valued child `key`.
///
/// Interior levels are only ever written as objects, so the downcast cannot
/// fail for maps produced by this module.
fn child_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    map.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .expect("interior export levels are objects")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn im_with(interner: &StringInterner, items: &[(&str, Datum)]) -> IndexedMap {
        let mut im = IndexedMap::new();
        for (key, value) in items {
            im.add_item(interner, key, *value);
        }
        im
    }

    #[test]
    fn test_add_item_accumulates() {
        let interner = StringInterner::new();
        let mut im = IndexedMap::new();
        im.add_item(&interner, "size$*$*$*", Datum::int(100));
        im.add_item(&interner, "size$*$*$*", Datum::int(200));

        assert_eq!(im.len(), 1);
        assert_eq!(
            im.get_by_key(&interner, "size$*$*$*"),
            Some(&Datum::Int(300))
        );
    }

    #[test]
    fn test_combine_copies_and_adds() {
        let interner = StringInterner::new();
        let mut a = im_with(&interner, &[("size$*$*$*", Datum::int(10))]);
        let b = im_with(
            &interner,
            &[("size$*$*$*", Datum::int(5)), ("count$*$*$*", Datum::int(1))],
        );

        a.combine(&b);
        assert_eq!(a.get_by_key(&interner, "size$*$*$*"), Some(&Datum::Int(15)));
        assert_eq!(a.get_by_key(&interner, "count$*$*$*"), Some(&Datum::Int(1)));
    }

    #[test]
    fn test_subtract_self_empties() {
        // Subtracting a map from itself must leave it empty.
        let interner = StringInterner::new();
        let mut im = im_with(&interner, &[("size$*$*$*", Datum::int(42))]);
        let snapshot = im.clone();

        im.subtract(&snapshot);
        assert!(im.is_empty());
    }

    #[test]
    fn test_subtract_prunes_float_noise() {
        let interner = StringInterner::new();
        let mut a = im_with(&interner, &[("atime$*$*$*", Datum::float(1.0))]);
        let b = im_with(&interner, &[("atime$*$*$*", Datum::float(1.0 + 1e-14))]);

        a.subtract(&b);
        assert!(a.is_empty());
    }

    #[test]
    fn test_subtract_keeps_disjoint_entries() {
        let interner = StringInterner::new();
        let mut a = im_with(
            &interner,
            &[("size$*$*$*", Datum::int(10)), ("count$*$*$*", Datum::int(2))],
        );
        let b = im_with(&interner, &[("size$*$*$*", Datum::int(4))]);

        a.subtract(&b);
        assert_eq!(a.get_by_key(&interner, "size$*$*$*"), Some(&Datum::Int(6)));
        assert_eq!(a.get_by_key(&interner, "count$*$*$*"), Some(&Datum::Int(2)));
    }

    #[test]
    fn test_nested_export_shape() {
        let interner = StringInterner::new();
        let im = im_with(
            &interner,
            &[
                ("size$hgi$alice$bam", Datum::int(100)),
                ("size$hgi$alice$*", Datum::int(100)),
                ("count$hgi$alice$bam", Datum::int(1)),
            ],
        );

        let json = im.to_json_nested(&interner);
        assert_eq!(json["size"]["hgi"]["alice"]["bam"], 100);
        assert_eq!(json["size"]["hgi"]["alice"]["*"], 100);
        assert_eq!(json["count"]["hgi"]["alice"]["bam"], 1);
    }

    #[test]
    fn test_nested_export_skips_malformed_keys() {
        let interner = StringInterner::new();
        let im = im_with(
            &interner,
            &[
                ("sizesize$hgi$other", Datum::int(9)),
                ("size$hgi$alice$bam", Datum::int(1)),
            ],
        );

        let json = im.to_json_nested(&interner);
        let top = json.as_object().unwrap();
        assert_eq!(top.len(), 1);
        assert!(top.contains_key("size"));
    }

    #[test]
    fn test_single_export_is_flat() {
        let interner = StringInterner::new();
        let im = im_with(&interner, &[("sizesize$hgi$other", Datum::int(9))]);

        let json = im.to_json_single(&interner, "sizesize$hgi$other");
        assert_eq!(json["sizesize$hgi$other"], 9);

        let missing = im.to_json_single(&interner, "absent");
        assert_eq!(missing, serde_json::json!({}));
    }
}
