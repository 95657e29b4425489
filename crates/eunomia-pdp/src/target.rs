//! Target matching: the applicability predicate gating every rule,
//! policy, and policy set.
//!
//! A [`Target`] is a disjunction (AnyOf) of conjunctive clauses (AllOf). An
//! AllOf clause maps attribute names to required values; it matches when
//! every pair's resolved value strictly equals the required value. A target
//! with no clauses is a wildcard and matches everything.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeResolver, AttributeValue};

/// A conjunctive clause: every listed attribute must equal its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllOf {
    pairs: IndexMap<String, AttributeValue>,
}

impl AllOf {
    /// Create an empty clause. An empty clause matches any request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an attribute to equal the given value.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.pairs.insert(name.into(), value.into());
        self
    }

    /// The (name, required value) pairs of the clause.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check whether every pair is satisfied by the resolver.
    ///
    /// A resolution failure (missing attribute, failed callable) makes the
    /// clause unsatisfied; the error is contained here.
    fn satisfied_by(&self, resolver: &dyn AttributeResolver) -> bool {
        self.pairs.iter().all(|(name, required)| {
            resolver
                .resolve(name)
                .map_or(false, |resolved| resolved == *required)
        })
    }
}

impl From<IndexMap<String, AttributeValue>> for AllOf {
    fn from(pairs: IndexMap<String, AttributeValue>) -> Self {
        Self { pairs }
    }
}

/// An applicability target: AnyOf over [`AllOf`] clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target {
    any_of: Vec<AllOf>,
}

impl Target {
    /// Create a wildcard target that matches every request.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Create a target from a single clause.
    pub fn from_clause(clause: AllOf) -> Self {
        Self {
            any_of: vec![clause],
        }
    }

    /// Add a clause to the disjunction.
    pub fn with_clause(mut self, clause: AllOf) -> Self {
        self.any_of.push(clause);
        self
    }

    /// Convenience: a target matching a single attribute equality.
    pub fn matching(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::from_clause(AllOf::new().with_attribute(name, value))
    }

    /// The clauses of the disjunction.
    pub fn clauses(&self) -> &[AllOf] {
        &self.any_of
    }

    /// Check if this target matches everything.
    pub fn is_wildcard(&self) -> bool {
        self.any_of.is_empty()
    }

    /// Evaluate the target against an attribute resolver.
    ///
    /// The target matches iff at least one clause is satisfied, or the
    /// target has no clauses at all. No side effects; resolver failures are
    /// contained per clause.
    pub fn matches(&self, resolver: &dyn AttributeResolver) -> bool {
        self.any_of.is_empty() || self.any_of.iter().any(|clause| clause.satisfied_by(resolver))
    }
}
