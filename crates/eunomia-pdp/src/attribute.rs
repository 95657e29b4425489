//! Attribute bags and lazy attribute resolution.
//!
//! Attribute values are JSON values: the same currency the surrounding
//! platform uses for request metadata. Two kinds of sources exist: the
//! request's own name→value bag, matched by targets, and a secondary store
//! whose entries may be literals or zero-argument callables evaluated
//! lazily on first access and memoized per store instance.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{PdpError, PdpResult};

/// An attribute value.
pub type AttributeValue = serde_json::Value;

/// An ordered name→value attribute bag.
pub type AttributeBag = IndexMap<String, AttributeValue>;

/// Name-keyed attribute lookup.
///
/// Implemented by [`crate::context::Request`] for target matching and by
/// [`AttributeStore`] for condition/effect/obligation attributes. A failed
/// resolution is an error value; callers decide whether that means
/// "clause not satisfied" (target matching) or "indeterminate" (conditions).
pub trait AttributeResolver {
    /// Resolve the attribute with the given name.
    fn resolve(&self, name: &str) -> PdpResult<AttributeValue>;
}

/// A bound attribute: either a literal or a deferred callable.
#[derive(Clone)]
enum AttributeSource {
    /// A plain value.
    Value(AttributeValue),
    /// A zero-argument callable evaluated on first access.
    Lazy(Arc<dyn Fn() -> PdpResult<AttributeValue> + Send + Sync>),
}

impl fmt::Debug for AttributeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Lazy(_) => f.debug_tuple("Lazy").field(&"<fn>").finish(),
        }
    }
}

/// A memoizing attribute store.
///
/// Lazy entries are invoked at most once per store instance; the result,
/// success or failure, is cached for the lifetime of the store. A store
/// belongs to one [`crate::context::Context`] and is discarded with it, so
/// the memo cache uses plain interior mutability and the store is
/// deliberately not `Sync`.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    /// Bound attributes.
    entries: IndexMap<String, AttributeSource>,
    /// Memoized results of lazy entries.
    resolved: RefCell<HashMap<String, PdpResult<AttributeValue>>>,
    /// Set once any resolution has been attempted.
    consulted: Cell<bool>,
}

impl AttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a literal attribute value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.entries
            .insert(name.into(), AttributeSource::Value(value.into()));
        self
    }

    /// Bind a lazily evaluated attribute.
    ///
    /// The callable runs on first resolution and its result, success or
    /// failure, is memoized; it is invoked at most once per store instance.
    pub fn with_lazy(
        mut self,
        name: impl Into<String>,
        f: impl Fn() -> PdpResult<AttributeValue> + Send + Sync + 'static,
    ) -> Self {
        self.entries
            .insert(name.into(), AttributeSource::Lazy(Arc::new(f)));
        self
    }

    /// Number of bound attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no attributes are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any resolution has been attempted on this store, including
    /// lookups of absent names.
    pub fn was_consulted(&self) -> bool {
        self.consulted.get()
    }
}

impl AttributeResolver for AttributeStore {
    fn resolve(&self, name: &str) -> PdpResult<AttributeValue> {
        self.consulted.set(true);
        if let Some(result) = self.resolved.borrow().get(name) {
            return result.clone();
        }
        match self.entries.get(name) {
            Some(AttributeSource::Value(value)) => Ok(value.clone()),
            Some(AttributeSource::Lazy(f)) => {
                let result = f();
                self.resolved
                    .borrow_mut()
                    .insert(name.to_string(), result.clone());
                result
            }
            None => Err(PdpError::attribute_not_found(name)),
        }
    }
}
