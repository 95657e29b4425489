//! Boolean callables for conditions and effects.
//!
//! A [`Logical`] wraps a `Fn(&Context) -> PdpResult<bool>`. Failure is a
//! value, not a panic: the rule evaluator turns an `Err` into an
//! `INDETERMINATE*` decision instead of unwinding past the rule boundary.
//!
//! Constant logicals remember their boolean so the evaluator can shade an
//! indeterminate result by a statically known effect polarity.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::PdpResult;

type Predicate = Arc<dyn Fn(&Context) -> PdpResult<bool> + Send + Sync>;

/// A condition or effect callable over the evaluation context.
#[derive(Clone)]
pub struct Logical {
    predicate: Predicate,
    /// Set when the predicate is a known constant.
    constant: Option<bool>,
}

impl Logical {
    /// Wrap an arbitrary predicate.
    pub fn new(f: impl Fn(&Context) -> PdpResult<bool> + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(f),
            constant: None,
        }
    }

    /// A constant predicate.
    pub fn constant(value: bool) -> Self {
        Self {
            predicate: Arc::new(move |_| Ok(value)),
            constant: Some(value),
        }
    }

    /// The always-true predicate (default condition, PERMIT-shaped effect).
    pub fn always() -> Self {
        Self::constant(true)
    }

    /// The always-false predicate (DENY-shaped effect).
    pub fn never() -> Self {
        Self::constant(false)
    }

    /// A predicate that reads a boolean secondary attribute.
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |ctx| ctx.attribute_bool(&name))
    }

    /// Evaluate the predicate against a context.
    pub fn evaluate(&self, ctx: &Context) -> PdpResult<bool> {
        (self.predicate)(ctx)
    }

    /// The statically known value, if this is a constant predicate.
    pub fn known_value(&self) -> Option<bool> {
        self.constant
    }
}

impl Default for Logical {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Logical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.constant {
            Some(value) => f.debug_tuple("Logical").field(&value).finish(),
            None => f.debug_tuple("Logical").field(&"<fn>").finish(),
        }
    }
}
