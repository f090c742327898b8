//! Persistent, layered key/value store.
//!
//! A [`Metadata`] store is an immutable stack of layers. [`Metadata::derive`]
//! pushes one new layer and returns a new store; the old store is untouched
//! and both share the older layers structurally, so stores form a persistent
//! tree and deriving is O(1) in the number of existing layers. Lookup scans
//! newest layer first; a key in a newer layer shadows the same key below.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::convert::{self, FromMetadata};
use crate::error::{MetadataError, Result};
use crate::value::MetadataValue;

/// A persistent, layered metadata store.
///
/// Cloning is cheap (one `Arc` bump) and clones are fully independent views.
/// All reads are safe from any thread; the store is never mutated in place.
#[derive(Clone, Default)]
pub struct Metadata {
    head: Option<Arc<Layer>>,
}

struct Layer {
    entries: HashMap<String, MetadataValue>,
    parent: Option<Arc<Layer>>,
}

impl Metadata {
    /// An empty store with no layers.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// A store with a single layer built from the given entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        Metadata::new().derive(entries)
    }

    /// Push one new layer on top of this store, returning the derived store.
    ///
    /// `self` remains valid and unchanged; the two stores share every layer
    /// below the new one.
    pub fn derive<I>(&self, entries: I) -> Metadata
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        Metadata {
            head: Some(Arc::new(Layer {
                entries: entries.into_iter().collect(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Whether any layer holds the key. Never triggers lazy evaluation.
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Resolve the value under `key`, newest layer first.
    ///
    /// Returns `Ok(None)` for a missing key; a lazy compute failure
    /// propagates as an error rather than being swallowed.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.find(key) {
            Some(MetadataValue::Literal(v)) => Ok(Some(v.clone())),
            Some(MetadataValue::Lazy(lz)) => lz.resolve(key, self).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve the value under `key`, falling back to `default` when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Typed access: resolve and convert, falling back to `default` when the
    /// key is absent or the value is not convertible to `T`. A lazy compute
    /// failure still propagates.
    pub fn get_as<T: FromMetadata>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key)? {
            Some(value) => Ok(convert::convert(&value).unwrap_or(default)),
            None => Ok(default),
        }
    }

    /// Strict typed access: `KeyNotFound` when absent, `Conversion` when the
    /// value cannot become a `T`.
    pub fn require<T: FromMetadata>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)?
            .ok_or_else(|| MetadataError::KeyNotFound(key.to_string()))?;
        convert::convert(&value).ok_or_else(|| MetadataError::Conversion {
            key: key.to_string(),
            from: convert::kind(&value),
            to: T::type_name(),
        })
    }

    /// Number of distinct keys across all layers (shadowing counted once).
    pub fn len(&self) -> usize {
        self.visible_keys().len()
    }

    /// Whether no layer holds any key.
    pub fn is_empty(&self) -> bool {
        self.head.is_none() || self.len() == 0
    }

    /// Distinct keys across all layers, sorted. Never triggers lazy
    /// evaluation.
    pub fn keys(&self) -> Vec<String> {
        self.visible_keys().into_iter().collect()
    }

    /// Resolve every visible entry, each key exactly once with the newest
    /// layer winning. Deterministic (sorted by key) for a fixed layer stack;
    /// each visited lazy value is resolved exactly once per call.
    pub fn entries(&self) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for key in self.visible_keys() {
            let value = self
                .get(&key)?
                .ok_or_else(|| MetadataError::KeyNotFound(key.clone()))?;
            out.push((key, value));
        }
        Ok(out)
    }

    /// Resolved values in key order.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    fn find(&self, key: &str) -> Option<&MetadataValue> {
        let mut layer = self.head.as_deref();
        while let Some(l) = layer {
            if let Some(v) = l.entries.get(key) {
                return Some(v);
            }
            layer = l.parent.as_deref();
        }
        None
    }

    fn visible_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        let mut layer = self.head.as_deref();
        while let Some(l) = layer {
            keys.extend(l.entries.keys().cloned());
            layer = l.parent.as_deref();
        }
        keys
    }
}

impl std::fmt::Debug for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CachePolicy;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry(key: &str, value: impl Into<MetadataValue>) -> (String, MetadataValue) {
        (key.to_string(), value.into())
    }

    #[test]
    fn test_layering_and_shadowing() {
        let a = Metadata::from_entries([entry("k", 1i64)]);
        let b = a.derive([entry("k", 2i64)]);

        assert_eq!(b.get("k").unwrap(), Some(json!(2)));

        // Deriving an empty layer on top still sees the shadowing value.
        let c = b.derive([]);
        assert_eq!(c.get("k").unwrap(), Some(json!(2)));

        // The original stores are unaffected.
        assert_eq!(a.get("k").unwrap(), Some(json!(1)));
        assert_eq!(b.get("k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_missing_key_is_not_an_error() {
        let m = Metadata::new();
        assert_eq!(m.get("absent").unwrap(), None);
        assert_eq!(m.get_or("absent", json!("fallback")).unwrap(), json!("fallback"));
    }

    #[test]
    fn test_get_as_defaults() {
        let m = Metadata::from_entries([entry("n", 3i64), entry("s", "words")]);
        // Present and convertible.
        assert_eq!(m.get_as("n", 0i64).unwrap(), 3);
        // Present but unconvertible — default.
        assert_eq!(m.get_as("s", 9i64).unwrap(), 9);
        // Absent — default.
        assert_eq!(m.get_as("missing", 5i64).unwrap(), 5);
    }

    #[test]
    fn test_require_errors() {
        let m = Metadata::from_entries([entry("s", "words")]);
        assert!(matches!(
            m.require::<i64>("missing").unwrap_err(),
            MetadataError::KeyNotFound(k) if k == "missing"
        ));
        assert!(matches!(
            m.require::<i64>("s").unwrap_err(),
            MetadataError::Conversion { from: "string", to: "i64", .. }
        ));
    }

    #[test]
    fn test_contains_does_not_resolve_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let m = Metadata::from_entries([(
            "lazy".to_string(),
            MetadataValue::lazy(CachePolicy::Uncached, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(0))
            }),
        )]);

        assert!(m.contains("lazy"));
        assert!(!m.contains("other"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lazy_cached_once_through_get() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let m = Metadata::from_entries([(
            "lazy".to_string(),
            MetadataValue::lazy(CachePolicy::CachedOnce, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(11))
            }),
        )]);

        assert_eq!(m.get("lazy").unwrap(), Some(json!(11)));
        assert_eq!(m.get("lazy").unwrap(), Some(json!(11)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_sees_other_keys() {
        let m = Metadata::from_entries([
            entry("base", 20i64),
            (
                "derived".to_string(),
                MetadataValue::lazy(CachePolicy::Uncached, |_, view| {
                    let base = view.get_as("base", 0i64)?;
                    Ok(json!(base + 1))
                }),
            ),
        ]);

        assert_eq!(m.get("derived").unwrap(), Some(json!(21)));
    }

    #[test]
    fn test_lazy_failure_propagates() {
        let m = Metadata::from_entries([(
            "bad".to_string(),
            MetadataValue::lazy(CachePolicy::Uncached, |key, _| {
                Err(MetadataError::Resolution {
                    key: key.to_string(),
                    message: "boom".into(),
                })
            }),
        )]);

        let err = m.get("bad").unwrap_err();
        assert!(err.to_string().contains("bad"));
        // Enumeration propagates the same failure.
        assert!(m.entries().is_err());
    }

    #[test]
    fn test_enumeration_shadowing_and_determinism() {
        let m = Metadata::from_entries([entry("a", 1i64), entry("b", 2i64)])
            .derive([entry("b", 3i64), entry("c", 4i64)]);

        assert_eq!(m.len(), 3);
        assert_eq!(m.keys(), vec!["a", "b", "c"]);
        assert_eq!(
            m.entries().unwrap(),
            vec![
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(3)),
                ("c".to_string(), json!(4)),
            ]
        );
        assert_eq!(m.values().unwrap(), vec![json!(1), json!(3), json!(4)]);
    }

    #[test]
    fn test_enumeration_resolves_each_lazy_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let m = Metadata::from_entries([
            entry("plain", 1i64),
            (
                "lazy".to_string(),
                MetadataValue::lazy(CachePolicy::Uncached, move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(2))
                }),
            ),
        ]);

        let entries = m.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_derive_is_structural_sharing() {
        let base = Metadata::from_entries([entry("k", 1i64)]);
        // Derivation does not copy the base layer; many derived stores can
        // coexist against the same parent.
        let children: Vec<_> = (0..10)
            .map(|i| base.derive([entry("child", i as i64)]))
            .collect();
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.get("child").unwrap(), Some(json!(i)));
            assert_eq!(child.get("k").unwrap(), Some(json!(1)));
        }
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_concurrent_reads() {
        let m = Arc::new(Metadata::from_entries([entry("n", 10i64)]).derive([entry("m", 20i64)]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert_eq!(m.get_as("n", 0i64).unwrap(), 10);
                        assert_eq!(m.get_as("m", 0i64).unwrap(), 20);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
