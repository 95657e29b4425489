//! The five combining algorithms, at rule and at policy level.
//!
//! Both levels share the same five fold shapes; a closed enum per level
//! keeps the dispatch exhaustive and testable per variant. The fold logic
//! itself is generic over an outcome iterator, so the rule and policy
//! plans reuse one implementation.
//!
//! Tie-break rules for the overrides algorithms distinguish the
//! indeterminate shades: an error on the overriding side mixed with the
//! other side's error or a concrete result of the other side collapses to
//! `INDETERMINATE_DENY_OR_PERMIT`.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::decision::{bare, Decision, Outcome};
use crate::plan::{PolicyPlan, RulePlan};
use crate::policy::PolicyChild;
use crate::rule::Rule;
use crate::trace::DecisionTrace;

/// Rule combining algorithm: folds an ordered list of rule outcomes into
/// one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCombiningAlgorithm {
    /// A DENY from any rule wins immediately.
    #[default]
    DenyOverrides,
    /// A PERMIT from any rule wins immediately.
    PermitOverrides,
    /// PERMIT iff at least one rule cleanly permits; otherwise DENY.
    DenyUnlessPermit,
    /// DENY iff at least one rule cleanly denies; otherwise PERMIT.
    PermitUnlessDeny,
    /// The first applicable rule's outcome wins.
    FirstApplicable,
}

impl RuleCombiningAlgorithm {
    /// Compile the rules into an execution plan bound to this algorithm.
    ///
    /// Idempotent and pure: the plan never references or mutates the rules
    /// it was derived from.
    pub fn optimize(self, rules: &[Rule]) -> RulePlan {
        RulePlan::new(self, rules)
    }

    /// Evaluate a previously compiled plan against a context.
    ///
    /// The plan must have been produced by this algorithm's
    /// [`optimize`](Self::optimize).
    pub fn evaluate(self, ctx: &Context, plan: &RulePlan) -> Outcome {
        debug_assert_eq!(plan.algorithm(), self, "plan compiled by a different algorithm");
        plan.evaluate(ctx)
    }

    pub(crate) const fn kind(self) -> Kind {
        match self {
            Self::DenyOverrides => Kind::DenyOverrides,
            Self::PermitOverrides => Kind::PermitOverrides,
            Self::DenyUnlessPermit => Kind::DenyUnlessPermit,
            Self::PermitUnlessDeny => Kind::PermitUnlessDeny,
            Self::FirstApplicable => Kind::FirstApplicable,
        }
    }
}

/// Policy combining algorithm: the same five fold shapes applied to
/// policies and nested policy sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyCombiningAlgorithm {
    /// A DENY from any child wins immediately.
    #[default]
    DenyOverrides,
    /// A PERMIT from any child wins immediately.
    PermitOverrides,
    /// PERMIT iff at least one child cleanly permits; otherwise DENY.
    DenyUnlessPermit,
    /// DENY iff at least one child cleanly denies; otherwise PERMIT.
    PermitUnlessDeny,
    /// The first applicable child's outcome wins.
    FirstApplicable,
}

impl PolicyCombiningAlgorithm {
    /// Compile the children into an execution plan bound to this
    /// algorithm. Nested policy sets compile recursively into sub-plans.
    pub fn optimize(self, children: &[PolicyChild]) -> PolicyPlan {
        PolicyPlan::new(self, children)
    }

    /// Evaluate a previously compiled plan against a context.
    pub fn evaluate(self, ctx: &Context, plan: &PolicyPlan) -> Outcome {
        self.evaluate_with_trace(ctx, plan, None)
    }

    /// Evaluate with an optional diagnostic sink for indeterminate
    /// occurrences. The sink never affects the decision.
    pub fn evaluate_with_trace(
        self,
        ctx: &Context,
        plan: &PolicyPlan,
        trace: Option<&dyn DecisionTrace>,
    ) -> Outcome {
        debug_assert_eq!(plan.algorithm(), self, "plan compiled by a different algorithm");
        plan.evaluate_with_trace(ctx, trace)
    }

    pub(crate) const fn kind(self) -> Kind {
        match self {
            Self::DenyOverrides => Kind::DenyOverrides,
            Self::PermitOverrides => Kind::PermitOverrides,
            Self::DenyUnlessPermit => Kind::DenyUnlessPermit,
            Self::PermitUnlessDeny => Kind::PermitUnlessDeny,
            Self::FirstApplicable => Kind::FirstApplicable,
        }
    }
}

/// The shared fold shape behind both algorithm levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    DenyOverrides,
    PermitOverrides,
    DenyUnlessPermit,
    PermitUnlessDeny,
    FirstApplicable,
}

impl Kind {
    /// Fold an ordered sequence of outcomes into one.
    ///
    /// The iterator is consumed lazily, so short-circuiting algorithms
    /// never evaluate entities past their winning child.
    pub(crate) fn fold(self, outcomes: impl Iterator<Item = Outcome>) -> Outcome {
        match self {
            Self::DenyOverrides => overrides(outcomes, Decision::Deny),
            Self::PermitOverrides => overrides(outcomes, Decision::Permit),
            Self::DenyUnlessPermit => unless(outcomes, Decision::Permit),
            Self::PermitUnlessDeny => unless(outcomes, Decision::Deny),
            Self::FirstApplicable => first_applicable(outcomes),
        }
    }
}

const fn opposite(decision: Decision) -> Decision {
    match decision {
        Decision::Permit => Decision::Deny,
        _ => Decision::Permit,
    }
}

const fn indeterminate_of(decision: Decision) -> Decision {
    match decision {
        Decision::Permit => Decision::IndeterminatePermit,
        _ => Decision::IndeterminateDeny,
    }
}

/// Deny-Overrides and Permit-Overrides, parameterized by the overriding
/// decision.
///
/// The overriding decision wins immediately with its own obligations.
/// Otherwise the fold distinguishes which side an error occurred on: an
/// error on the overriding side combined with the other side's error or a
/// concrete result of the other side means either decision was possible.
fn overrides(outcomes: impl Iterator<Item = Outcome>, winner: Decision) -> Outcome {
    let loser = opposite(winner);
    let mut error_winner_side = false;
    let mut error_loser_side = false;
    let mut error_either_side = false;
    let mut saw_loser = false;
    let mut loser_obligations = Vec::new();
    let mut loser_advice = Vec::new();

    for (decision, obligations, advice) in outcomes {
        if decision == winner {
            return (winner, obligations, advice);
        }
        if decision == loser {
            saw_loser = true;
            loser_obligations.extend(obligations);
            loser_advice.extend(advice);
            continue;
        }
        match decision {
            Decision::NotApplicable => {}
            Decision::Indeterminate | Decision::IndeterminateDenyOrPermit => {
                error_either_side = true;
            }
            d if d == indeterminate_of(winner) => error_winner_side = true,
            _ => error_loser_side = true,
        }
    }

    if error_either_side || (error_winner_side && (error_loser_side || saw_loser)) {
        return bare(Decision::IndeterminateDenyOrPermit);
    }
    if error_winner_side {
        return bare(indeterminate_of(winner));
    }
    if saw_loser {
        return (loser, loser_obligations, loser_advice);
    }
    if error_loser_side {
        return bare(indeterminate_of(loser));
    }
    bare(Decision::NotApplicable)
}

/// Deny-Unless-Permit and Permit-Unless-Deny, parameterized by the sought
/// decision. Never returns NOT_APPLICABLE or INDETERMINATE: an empty or
/// fully inapplicable list falls back to the opposite decision.
fn unless(outcomes: impl Iterator<Item = Outcome>, sought: Decision) -> Outcome {
    let fallback = opposite(sought);
    let mut fallback_obligations = Vec::new();
    let mut fallback_advice = Vec::new();

    for (decision, obligations, advice) in outcomes {
        if decision == sought {
            return (sought, obligations, advice);
        }
        if decision == fallback {
            fallback_obligations.extend(obligations);
            fallback_advice.extend(advice);
        }
    }
    (fallback, fallback_obligations, fallback_advice)
}

/// First-Applicable: the first outcome that is not NOT_APPLICABLE wins,
/// including indeterminate ones.
fn first_applicable(outcomes: impl Iterator<Item = Outcome>) -> Outcome {
    for outcome in outcomes {
        if outcome.0 != Decision::NotApplicable {
            return outcome;
        }
    }
    bare(Decision::NotApplicable)
}
