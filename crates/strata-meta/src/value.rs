//! Metadata values — literal JSON data or deferred computations.
//!
//! Every metadata entry is a [`MetadataValue`]: either a literal
//! `serde_json::Value` or a [`LazyValue`] whose compute function runs when the
//! entry is first read. Lazy values carry a [`CachePolicy`] deciding whether
//! the first successful resolution is memoized.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::Result;
use crate::store::Metadata;

/// Caching behavior for a lazy metadata value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Recompute on every read.
    Uncached,
    /// Memoize the first successful resolution for the life of this value
    /// instance (shared across clones of the value).
    CachedOnce,
}

/// Compute function for a lazy value: `(key, metadata view) -> value`.
pub type ComputeFn = dyn Fn(&str, &Metadata) -> Result<Value> + Send + Sync;

/// A metadata entry: literal data or a deferred computation.
#[derive(Clone)]
pub enum MetadataValue {
    /// A literal scalar, sequence, or map.
    Literal(Value),
    /// A value computed on read.
    Lazy(LazyValue),
}

impl MetadataValue {
    /// Build a lazy value from a compute function and cache policy.
    pub fn lazy<F>(policy: CachePolicy, compute: F) -> Self
    where
        F: Fn(&str, &Metadata) -> Result<Value> + Send + Sync + 'static,
    {
        MetadataValue::Lazy(LazyValue::new(policy, compute))
    }

    /// Whether this entry is lazily computed.
    pub fn is_lazy(&self) -> bool {
        matches!(self, MetadataValue::Lazy(_))
    }
}

impl fmt::Debug for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            MetadataValue::Lazy(lz) => f
                .debug_struct("Lazy")
                .field("policy", &lz.policy())
                .finish_non_exhaustive(),
        }
    }
}

impl From<Value> for MetadataValue {
    fn from(value: Value) -> Self {
        MetadataValue::Literal(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Literal(Value::from(value))
    }
}

impl From<Vec<Value>> for MetadataValue {
    fn from(value: Vec<Value>) -> Self {
        MetadataValue::Literal(Value::Array(value))
    }
}

/// A lazily computed metadata value.
///
/// Compute functions must be referentially transparent and thread-safe:
/// under [`CachePolicy::Uncached`] there is no guarantee on when or how often
/// they fire. A compute function that reads its own key through the metadata
/// view it receives recurses without cycle detection; that is a caller error.
#[derive(Clone)]
pub struct LazyValue {
    inner: Arc<LazyInner>,
}

struct LazyInner {
    compute: Box<ComputeFn>,
    policy: CachePolicy,
    cell: OnceLock<Value>,
}

impl LazyValue {
    /// Create a lazy value with the given cache policy.
    pub fn new<F>(policy: CachePolicy, compute: F) -> Self
    where
        F: Fn(&str, &Metadata) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(LazyInner {
                compute: Box::new(compute),
                policy,
                cell: OnceLock::new(),
            }),
        }
    }

    /// The cache policy this value was created with.
    pub fn policy(&self) -> CachePolicy {
        self.inner.policy
    }

    /// Resolve the value against a metadata view.
    ///
    /// For `CachedOnce` the first successful resolution is stored and reused;
    /// a failed resolution is not memoized and a later read retries.
    pub(crate) fn resolve(&self, key: &str, view: &Metadata) -> Result<Value> {
        if self.inner.policy == CachePolicy::CachedOnce
            && let Some(cached) = self.inner.cell.get()
        {
            return Ok(cached.clone());
        }

        let value = (self.inner.compute)(key, view)?;

        if self.inner.policy == CachePolicy::CachedOnce {
            // A concurrent resolver may have won the race; either result is
            // valid since compute functions are referentially transparent.
            let _ = self.inner.cell.set(value.clone());
        }

        Ok(value)
    }
}
