//! Per-request evaluation context.
//!
//! A [`Context`] wraps the incoming [`Request`] (the primary bag targets
//! match against) and a secondary [`AttributeStore`] consumed by
//! conditions, effects, obligations, and advice. The store memoizes lazy
//! attributes per context instance, so a context is built for exactly one
//! request and discarded afterwards; it is deliberately not shared across
//! concurrent evaluations. The compiled plan, by contrast, is immutable and
//! freely shared (see [`crate::plan`]).

use indexmap::IndexMap;

use crate::attribute::{AttributeBag, AttributeResolver, AttributeStore, AttributeValue};
use crate::error::{PdpError, PdpResult};

/// The primary attribute bag of an incoming request.
///
/// This is the surface target matching runs against: resource, action, and
/// whatever else the enforcement point extracts from the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    attributes: AttributeBag,
}

impl Request {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to the request bag.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute without the resolver indirection.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// The full attribute bag, in insertion order.
    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }
}

impl From<AttributeBag> for Request {
    fn from(attributes: AttributeBag) -> Self {
        Self { attributes }
    }
}

impl From<IndexMap<&str, AttributeValue>> for Request {
    fn from(bag: IndexMap<&str, AttributeValue>) -> Self {
        Self {
            attributes: bag.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl AttributeResolver for Request {
    fn resolve(&self, name: &str) -> PdpResult<AttributeValue> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| PdpError::attribute_not_found(name))
    }
}

/// The evaluation context for one request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// The request bag, exposed for target matching.
    request: Request,
    /// Secondary attributes for conditions, effects, obligations, advice.
    attributes: AttributeStore,
}

impl Context {
    /// Create a context for the given request with no secondary attributes.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            attributes: AttributeStore::new(),
        }
    }

    /// Attach a secondary attribute store.
    pub fn with_attributes(mut self, attributes: AttributeStore) -> Self {
        self.attributes = attributes;
        self
    }

    /// Bind a literal secondary attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes = self.attributes.with_value(name, value);
        self
    }

    /// Bind a lazily evaluated secondary attribute.
    pub fn with_lazy_attribute(
        mut self,
        name: impl Into<String>,
        f: impl Fn() -> PdpResult<AttributeValue> + Send + Sync + 'static,
    ) -> Self {
        self.attributes = self.attributes.with_lazy(name, f);
        self
    }

    /// The request bag used for target matching.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Resolve a secondary attribute.
    ///
    /// Lazy attributes are invoked on first access and memoized for the
    /// lifetime of this context.
    pub fn attribute(&self, name: &str) -> PdpResult<AttributeValue> {
        self.attributes.resolve(name)
    }

    /// Whether any secondary attribute resolution was attempted in this
    /// context.
    ///
    /// Decisions that consulted the secondary store depend on more than
    /// the request bag and must not be replayed for other stores.
    pub fn secondary_consulted(&self) -> bool {
        self.attributes.was_consulted()
    }

    /// Resolve a secondary attribute, requiring a boolean value.
    ///
    /// Non-boolean values are a failed lookup for condition purposes.
    pub fn attribute_bool(&self, name: &str) -> PdpResult<bool> {
        match self.attribute(name)? {
            AttributeValue::Bool(b) => Ok(b),
            other => Err(PdpError::resolution(
                name,
                format!("expected boolean, got {other}"),
            )),
        }
    }
}

impl AttributeResolver for Context {
    fn resolve(&self, name: &str) -> PdpResult<AttributeValue> {
        self.attribute(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_request_resolution() {
        let request = Request::new().with_attribute("resource", "invoice");
        assert_eq!(request.resolve("resource").unwrap(), "invoice");
        assert!(request.resolve("absent").unwrap_err().is_attribute_not_found());
    }

    #[test]
    fn test_secondary_attributes_are_separate_from_request() {
        let ctx = Context::new(Request::new().with_attribute("resource", "invoice"))
            .with_attribute("department", "finance");

        // The secondary store does not fall back to the request bag.
        assert!(ctx.attribute("resource").is_err());
        assert_eq!(ctx.attribute("department").unwrap(), "finance");
        assert_eq!(ctx.request().get("resource").unwrap(), "invoice");
    }

    #[test]
    fn test_lazy_attribute_memoized_per_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ctx = Context::new(Request::new()).with_lazy_attribute("now", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(AttributeValue::from(1_700_000_000))
        });

        ctx.attribute("now").unwrap();
        ctx.attribute("now").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_secondary_consulted() {
        let ctx = Context::new(Request::new().with_attribute("action", "read"))
            .with_attribute("vetted", true);
        assert!(!ctx.secondary_consulted());

        // Request-bag lookups do not touch the secondary store.
        ctx.request().get("action");
        assert!(!ctx.secondary_consulted());

        ctx.attribute("vetted").unwrap();
        assert!(ctx.secondary_consulted());
    }

    #[test]
    fn test_attribute_bool() {
        let ctx = Context::new(Request::new())
            .with_attribute("active", true)
            .with_attribute("count", 3);
        assert!(ctx.attribute_bool("active").unwrap());
        assert!(ctx.attribute_bool("count").is_err());
        assert!(ctx.attribute_bool("absent").is_err());
    }
}
