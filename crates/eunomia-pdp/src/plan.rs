//! Optimized execution plans.
//!
//! `optimize()` collapses the authored Rule/Policy/PolicySet tree into
//! parallel arrays of pre-extracted targets and per-entity evaluation
//! bodies, plus one composed fold closure bound to the combining
//! algorithm. Repeated evaluation then runs against the flat plan instead
//! of re-walking the polymorphic object graph. Plans are immutable after
//! construction and safe to share across threads; all per-request state
//! lives in the [`Context`].
//!
//! Bodies are a tagged arena: a rule body carries its captured
//! condition/effect/obligations/advice, and a policy-set body carries its
//! recursively compiled sub-plan.

use std::fmt;
use std::sync::Arc;

use crate::combining::{PolicyCombiningAlgorithm, RuleCombiningAlgorithm};
use crate::context::Context;
use crate::decision::{bare, Decision, Outcome};
use crate::logical::Logical;
use crate::policy::{PolicyChild, PolicySet};
use crate::rule::{Advice, Obligation, Rule};
use crate::target::Target;
use crate::trace::DecisionTrace;

/// The captured evaluation body of one rule.
///
/// Holds clones of the rule's condition, effect, obligations, and advice;
/// the optimized plan never references the authored [`Rule`].
#[derive(Clone)]
pub(crate) struct RuleBody {
    id: Option<String>,
    condition: Logical,
    effect: Logical,
    obligations: Vec<Obligation>,
    advice: Vec<Advice>,
}

impl RuleBody {
    fn from_rule(rule: &Rule) -> Self {
        Self {
            id: rule.id().map(str::to_string),
            condition: rule.condition().clone(),
            effect: rule.effect().clone(),
            obligations: rule.obligations().to_vec(),
            advice: rule.advice().to_vec(),
        }
    }

    /// Evaluate condition and effect; the target gate already ran.
    ///
    /// Condition false is NOT_APPLICABLE. A failing condition or effect is
    /// contained here and shaded by the effect's statically known polarity:
    /// a constant-true effect could only have permitted, a constant-false
    /// one could only have denied, an opaque closure leaves both open.
    fn evaluate(&self, ctx: &Context) -> Outcome {
        match self.condition.evaluate(ctx) {
            Ok(true) => {}
            Ok(false) => return bare(Decision::NotApplicable),
            Err(_) => return bare(self.indeterminate()),
        }
        match self.effect.evaluate(ctx) {
            Ok(true) => self.conclude(Decision::Permit),
            Ok(false) => self.conclude(Decision::Deny),
            Err(_) => bare(self.indeterminate()),
        }
    }

    fn indeterminate(&self) -> Decision {
        match self.effect.known_value() {
            Some(true) => Decision::IndeterminatePermit,
            Some(false) => Decision::IndeterminateDeny,
            None => Decision::IndeterminateDenyOrPermit,
        }
    }

    /// Collect the obligations and advice fulfilled on the decision.
    fn conclude(&self, decision: Decision) -> Outcome {
        let obligations = self
            .obligations
            .iter()
            .filter(|o| o.fulfill_on() == decision)
            .map(Obligation::handler)
            .collect();
        let advice = self
            .advice
            .iter()
            .filter(|a| a.fulfill_on() == decision)
            .map(Advice::handler)
            .collect();
        (decision, obligations, advice)
    }
}

impl fmt::Debug for RuleBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBody")
            .field("id", &self.id)
            .field("condition", &self.condition)
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

/// Compiled plan for one rule list under one combining algorithm.
///
/// Cheap to clone and safe to share: evaluation takes `&self` and all
/// captured state is immutable.
#[derive(Clone)]
pub struct RulePlan {
    algorithm: RuleCombiningAlgorithm,
    targets: Arc<[Target]>,
    bodies: Arc<[RuleBody]>,
    fold: Arc<dyn Fn(&Context) -> Outcome + Send + Sync>,
}

impl RulePlan {
    pub(crate) fn new(algorithm: RuleCombiningAlgorithm, rules: &[Rule]) -> Self {
        let targets: Arc<[Target]> = rules
            .iter()
            .map(|rule| rule.target().cloned().unwrap_or_default())
            .collect::<Vec<_>>()
            .into();
        let bodies: Arc<[RuleBody]> = rules
            .iter()
            .map(RuleBody::from_rule)
            .collect::<Vec<_>>()
            .into();
        debug_assert_eq!(targets.len(), bodies.len(), "malformed plan");

        let kind = algorithm.kind();
        let fold: Arc<dyn Fn(&Context) -> Outcome + Send + Sync> = {
            let targets = Arc::clone(&targets);
            let bodies = Arc::clone(&bodies);
            Arc::new(move |ctx: &Context| {
                let outcomes = targets.iter().zip(bodies.iter()).map(|(target, body)| {
                    if target.matches(ctx.request()) {
                        body.evaluate(ctx)
                    } else {
                        bare(Decision::NotApplicable)
                    }
                });
                kind.fold(outcomes)
            })
        };

        Self {
            algorithm,
            targets,
            bodies,
            fold,
        }
    }

    /// The combining algorithm this plan was compiled by.
    pub fn algorithm(&self) -> RuleCombiningAlgorithm {
        self.algorithm
    }

    /// The pre-extracted targets, parallel to the rule bodies.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Number of rules in the plan.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check if the plan has no rules.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Run the composed fold against a context.
    ///
    /// Always returns a well-formed outcome; failures of user-supplied
    /// callables have been folded into `INDETERMINATE*` decisions.
    pub fn evaluate(&self, ctx: &Context) -> Outcome {
        (self.fold)(ctx)
    }
}

impl fmt::Debug for RulePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulePlan")
            .field("algorithm", &self.algorithm)
            .field("rules", &self.bodies.len())
            .finish_non_exhaustive()
    }
}

/// The captured evaluation body of one policy or nested policy set.
#[derive(Clone)]
pub(crate) enum PolicyBody {
    /// A leaf policy: its compiled rule plan plus policy-level
    /// obligations and advice.
    Policy {
        id: Option<String>,
        rules: RulePlan,
        obligations: Vec<Obligation>,
        advice: Vec<Advice>,
    },
    /// A nested policy set: its recursively compiled sub-plan.
    Set {
        id: Option<String>,
        plan: PolicyPlan,
    },
}

impl PolicyBody {
    fn from_child(child: &PolicyChild) -> Self {
        match child {
            PolicyChild::Policy(policy) => Self::Policy {
                id: policy.id().map(str::to_string),
                rules: policy.algorithm().optimize(policy.rules()),
                obligations: policy.obligations().to_vec(),
                advice: policy.advice().to_vec(),
            },
            PolicyChild::Set(set) => Self::Set {
                id: set.id().map(str::to_string),
                plan: PolicyPlan::new(set.algorithm(), set.children()),
            },
        }
    }

    fn evaluate(&self, ctx: &Context, trace: Option<&dyn DecisionTrace>) -> Outcome {
        match self {
            Self::Policy {
                rules,
                obligations,
                advice,
                ..
            } => {
                let (decision, mut out_obligations, mut out_advice) = rules.evaluate(ctx);
                if decision.is_concrete() {
                    out_obligations.extend(
                        obligations
                            .iter()
                            .filter(|o| o.fulfill_on() == decision)
                            .map(Obligation::handler),
                    );
                    out_advice.extend(
                        advice
                            .iter()
                            .filter(|a| a.fulfill_on() == decision)
                            .map(Advice::handler),
                    );
                }
                (decision, out_obligations, out_advice)
            }
            Self::Set { plan, .. } => plan.evaluate_with_trace(ctx, trace),
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Policy { id, .. } | Self::Set { id, .. } => {
                id.as_deref().unwrap_or("<anonymous>")
            }
        }
    }
}

impl fmt::Debug for PolicyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy { id, rules, .. } => f
                .debug_struct("Policy")
                .field("id", id)
                .field("rules", &rules.len())
                .finish_non_exhaustive(),
            Self::Set { id, plan } => f
                .debug_struct("Set")
                .field("id", id)
                .field("children", &plan.len())
                .finish_non_exhaustive(),
        }
    }
}

/// Compiled plan for a policy/policy-set list under one combining
/// algorithm.
#[derive(Clone)]
pub struct PolicyPlan {
    algorithm: PolicyCombiningAlgorithm,
    targets: Arc<[Target]>,
    bodies: Arc<[PolicyBody]>,
    #[allow(clippy::type_complexity)]
    fold: Arc<dyn Fn(&Context, Option<&dyn DecisionTrace>) -> Outcome + Send + Sync>,
}

impl PolicyPlan {
    pub(crate) fn new(algorithm: PolicyCombiningAlgorithm, children: &[PolicyChild]) -> Self {
        let targets: Arc<[Target]> = children
            .iter()
            .map(|child| child.target().cloned().unwrap_or_default())
            .collect::<Vec<_>>()
            .into();
        let bodies: Arc<[PolicyBody]> = children
            .iter()
            .map(PolicyBody::from_child)
            .collect::<Vec<_>>()
            .into();
        debug_assert_eq!(targets.len(), bodies.len(), "malformed plan");

        let kind = algorithm.kind();
        let fold: Arc<dyn Fn(&Context, Option<&dyn DecisionTrace>) -> Outcome + Send + Sync> = {
            let targets = Arc::clone(&targets);
            let bodies = Arc::clone(&bodies);
            Arc::new(
                move |ctx: &Context, trace: Option<&dyn DecisionTrace>| {
                    let outcomes = targets.iter().zip(bodies.iter()).map(|(target, body)| {
                        if !target.matches(ctx.request()) {
                            return bare(Decision::NotApplicable);
                        }
                        let outcome = body.evaluate(ctx, trace);
                        if outcome.0.is_indeterminate() {
                            if let Some(sink) = trace {
                                sink.record(body.label(), outcome.0);
                            }
                        }
                        outcome
                    });
                    kind.fold(outcomes)
                },
            )
        };

        Self {
            algorithm,
            targets,
            bodies,
            fold,
        }
    }

    /// Compile a whole policy set, gating its own target like any nested
    /// set's: the set becomes the sole child of a wrapper plan under its
    /// own algorithm.
    pub(crate) fn for_set(set: &PolicySet) -> Self {
        Self::new(set.algorithm(), &[PolicyChild::Set(set.clone())])
    }

    /// The combining algorithm this plan was compiled by.
    pub fn algorithm(&self) -> PolicyCombiningAlgorithm {
        self.algorithm
    }

    /// The pre-extracted targets, parallel to the bodies.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Number of direct children in the plan.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check if the plan has no children.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Run the composed fold against a context, without diagnostics.
    pub fn evaluate(&self, ctx: &Context) -> Outcome {
        (self.fold)(ctx, None)
    }

    /// Run the composed fold with an optional diagnostic sink recording
    /// indeterminate children. The sink never affects the decision.
    pub fn evaluate_with_trace(
        &self,
        ctx: &Context,
        trace: Option<&dyn DecisionTrace>,
    ) -> Outcome {
        (self.fold)(ctx, trace)
    }
}

impl fmt::Debug for PolicyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyPlan")
            .field("algorithm", &self.algorithm)
            .field("children", &self.bodies.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Request;
    use crate::error::PdpError;
    use crate::policy::Policy;

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        Context::new(
            pairs
                .iter()
                .fold(Request::new(), |r, (k, v)| r.with_attribute(*k, *v)),
        )
    }

    #[test]
    fn test_rule_body_condition_false_is_not_applicable() {
        let plan = RuleCombiningAlgorithm::DenyOverrides
            .optimize(&[Rule::new().with_condition(Logical::never())]);
        let (decision, obligations, advice) = plan.evaluate(&ctx(&[]));
        assert_eq!(decision, Decision::NotApplicable);
        assert!(obligations.is_empty());
        assert!(advice.is_empty());
    }

    #[test]
    fn test_rule_body_effect_false_is_deny() {
        let plan = RuleCombiningAlgorithm::FirstApplicable
            .optimize(&[Rule::new().with_effect(Logical::never())]);
        assert_eq!(plan.evaluate(&ctx(&[])).0, Decision::Deny);
    }

    #[test]
    fn test_condition_error_shaded_by_effect_polarity() {
        let failing = || Logical::new(|_| Err(PdpError::condition("boom")));

        let permit_shaped = RuleCombiningAlgorithm::FirstApplicable
            .optimize(&[Rule::new().with_condition(failing())]);
        assert_eq!(
            permit_shaped.evaluate(&ctx(&[])).0,
            Decision::IndeterminatePermit
        );

        let deny_shaped = RuleCombiningAlgorithm::FirstApplicable.optimize(&[Rule::new()
            .with_condition(failing())
            .with_effect(Logical::never())]);
        assert_eq!(
            deny_shaped.evaluate(&ctx(&[])).0,
            Decision::IndeterminateDeny
        );

        let opaque = RuleCombiningAlgorithm::FirstApplicable.optimize(&[Rule::new()
            .with_condition(failing())
            .with_effect(Logical::new(|_| Ok(true)))]);
        assert_eq!(
            opaque.evaluate(&ctx(&[])).0,
            Decision::IndeterminateDenyOrPermit
        );
    }

    #[test]
    fn test_target_gate_before_condition() {
        // The condition would fail, but the target never matches, so the
        // rule is simply not applicable.
        let plan = RuleCombiningAlgorithm::DenyOverrides.optimize(&[Rule::new()
            .with_target(Target::matching("action", "write"))
            .with_condition(Logical::new(|_| Err(PdpError::condition("boom"))))]);
        assert_eq!(
            plan.evaluate(&ctx(&[("action", "read")])).0,
            Decision::NotApplicable
        );
    }

    #[test]
    fn test_plan_does_not_reference_authored_rules() {
        let rules = vec![Rule::new().with_id("r1")];
        let plan = RuleCombiningAlgorithm::DenyOverrides.optimize(&rules);
        drop(rules);
        assert_eq!(plan.evaluate(&ctx(&[])).0, Decision::Permit);
    }

    #[test]
    fn test_plan_shared_across_threads() {
        let plan = RuleCombiningAlgorithm::DenyOverrides.optimize(&[Rule::new()]);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let plan = plan.clone();
                std::thread::spawn(move || plan.evaluate(&ctx(&[])).0)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Decision::Permit);
        }
    }

    #[test]
    fn test_policy_plan_gates_child_targets() {
        let policy = Policy::new()
            .with_id("writeonly")
            .with_target(Target::matching("action", "write"))
            .with_rule(Rule::new());
        let plan = PolicyCombiningAlgorithm::DenyOverrides
            .optimize(&[PolicyChild::Policy(policy)]);

        assert_eq!(plan.evaluate(&ctx(&[("action", "write")])).0, Decision::Permit);
        assert_eq!(
            plan.evaluate(&ctx(&[("action", "read")])).0,
            Decision::NotApplicable
        );
    }

    #[test]
    fn test_policy_level_obligations_filtered_by_decision() {
        let policy = Policy::new()
            .with_rule(Rule::new())
            .with_obligation(Obligation::new(Decision::Permit, |_| {}))
            .with_obligation(Obligation::new(Decision::Deny, |_| {}));
        let plan =
            PolicyCombiningAlgorithm::DenyOverrides.optimize(&[PolicyChild::Policy(policy)]);

        let (decision, obligations, _) = plan.evaluate(&ctx(&[]));
        assert_eq!(decision, Decision::Permit);
        assert_eq!(obligations.len(), 1);
    }
}
