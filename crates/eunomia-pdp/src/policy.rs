//! Policies and policy sets: the authored tree.
//!
//! A [`Policy`] combines an ordered list of rules under a rule combining
//! algorithm; a [`PolicySet`] combines policies and nested policy sets
//! under a policy combining algorithm, to arbitrary depth. Both follow the
//! same fluent construction pattern as [`crate::rule::Rule`] and are
//! consumed read-only during evaluation: the one-time
//! [`PolicySet::compile`] walk produces the shareable execution plan.

use crate::combining::{PolicyCombiningAlgorithm, RuleCombiningAlgorithm};
use crate::plan::PolicyPlan;
use crate::rule::{Advice, Obligation, Rule};
use crate::target::Target;

/// A policy: target, ordered rules, and a rule combining algorithm.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    id: Option<String>,
    target: Option<Target>,
    rules: Vec<Rule>,
    algorithm: RuleCombiningAlgorithm,
    obligations: Vec<Obligation>,
    advice: Vec<Advice>,
}

impl Policy {
    /// Create an empty policy using the default combining algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an identifier used in diagnostics and the encoded form.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the applicability target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Append a rule. Order is significant for order-sensitive algorithms.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the rule combining algorithm.
    pub fn with_algorithm(mut self, algorithm: RuleCombiningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Attach an obligation at the policy level.
    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Attach advice at the policy level.
    pub fn with_advice(mut self, advice: Advice) -> Self {
        self.advice.push(advice);
        self
    }

    /// The policy identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The applicability target, if one was set.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// The ordered rules.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The rule combining algorithm.
    pub fn algorithm(&self) -> RuleCombiningAlgorithm {
        self.algorithm
    }

    /// Policy-level obligations.
    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Policy-level advice.
    pub fn advice(&self) -> &[Advice] {
        &self.advice
    }
}

/// A child of a policy set: a policy or a nested policy set.
#[derive(Debug, Clone)]
pub enum PolicyChild {
    /// A leaf policy.
    Policy(Policy),
    /// A nested policy set, recursing arbitrarily deep.
    Set(PolicySet),
}

impl PolicyChild {
    /// The child's applicability target, if one was set.
    pub fn target(&self) -> Option<&Target> {
        match self {
            Self::Policy(policy) => policy.target(),
            Self::Set(set) => set.target(),
        }
    }

    /// The child's identifier, if set.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Policy(policy) => policy.id(),
            Self::Set(set) => set.id(),
        }
    }
}

impl From<Policy> for PolicyChild {
    fn from(policy: Policy) -> Self {
        Self::Policy(policy)
    }
}

impl From<PolicySet> for PolicyChild {
    fn from(set: PolicySet) -> Self {
        Self::Set(set)
    }
}

/// A policy set: target, ordered children, and a policy combining
/// algorithm.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    id: Option<String>,
    target: Option<Target>,
    children: Vec<PolicyChild>,
    algorithm: PolicyCombiningAlgorithm,
}

impl PolicySet {
    /// Create an empty policy set using the default combining algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an identifier used in diagnostics and the encoded form.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the applicability target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Append a child policy or policy set.
    pub fn with_child(mut self, child: impl Into<PolicyChild>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Set the policy combining algorithm.
    pub fn with_algorithm(mut self, algorithm: PolicyCombiningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The set identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The applicability target, if one was set.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// The ordered children.
    pub fn children(&self) -> &[PolicyChild] {
        &self.children
    }

    /// The policy combining algorithm.
    pub fn algorithm(&self) -> PolicyCombiningAlgorithm {
        self.algorithm
    }

    /// Compile this set into its execution plan.
    ///
    /// The one-time tree walk; the returned plan is immutable, does not
    /// reference this set, and is safe to share across threads for repeated
    /// evaluation.
    pub fn compile(&self) -> PolicyPlan {
        PolicyPlan::for_set(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = Policy::new();
        assert!(policy.rules().is_empty());
        assert_eq!(policy.algorithm(), RuleCombiningAlgorithm::DenyOverrides);
    }

    #[test]
    fn test_nested_set_construction() {
        let inner = PolicySet::new()
            .with_id("inner")
            .with_child(Policy::new().with_id("p1"));
        let outer = PolicySet::new()
            .with_id("outer")
            .with_child(inner)
            .with_child(Policy::new().with_id("p2"));

        assert_eq!(outer.children().len(), 2);
        assert_eq!(outer.children()[0].id(), Some("inner"));
        match &outer.children()[0] {
            PolicyChild::Set(set) => assert_eq!(set.children().len(), 1),
            PolicyChild::Policy(_) => panic!("expected nested set"),
        }
    }

    #[test]
    fn test_child_target_passthrough() {
        let policy = Policy::new().with_target(Target::matching("kind", "invoice"));
        let child = PolicyChild::from(policy);
        assert!(child.target().is_some());
    }
}
