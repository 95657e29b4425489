//! Rules and their attached obligations and advice.
//!
//! A [`Rule`] owns an optional target (default wildcard), a condition
//! (default true), an effect (default PERMIT-shaped), and lists of
//! obligations and advice. Rules are assembled with fluent setters during
//! authoring and consumed read-only during evaluation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::decision::{AdviceHandler, Decision, ObligationHandler};
use crate::logical::Logical;
use crate::target::Target;

/// A mandatory side-effect descriptor attached to a decision outcome.
///
/// The handler is collected, never executed, when the final decision equals
/// the fulfill-on value.
#[derive(Clone)]
pub struct Obligation {
    fulfill_on: Decision,
    handler: ObligationHandler,
}

impl Obligation {
    /// Create an obligation fulfilled on the given decision.
    pub fn new(fulfill_on: Decision, handler: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        Self {
            fulfill_on,
            handler: Arc::new(handler),
        }
    }

    /// The decision this obligation is fulfilled on.
    pub fn fulfill_on(&self) -> Decision {
        self.fulfill_on
    }

    /// A clone of the handler for collection into an outcome.
    pub fn handler(&self) -> ObligationHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Obligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obligation")
            .field("fulfill_on", &self.fulfill_on)
            .finish_non_exhaustive()
    }
}

/// A non-mandatory side-effect descriptor; same mechanics as
/// [`Obligation`].
#[derive(Clone)]
pub struct Advice {
    fulfill_on: Decision,
    handler: AdviceHandler,
}

impl Advice {
    /// Create advice fulfilled on the given decision.
    pub fn new(fulfill_on: Decision, handler: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        Self {
            fulfill_on,
            handler: Arc::new(handler),
        }
    }

    /// The decision this advice is fulfilled on.
    pub fn fulfill_on(&self) -> Decision {
        self.fulfill_on
    }

    /// A clone of the handler for collection into an outcome.
    pub fn handler(&self) -> AdviceHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advice")
            .field("fulfill_on", &self.fulfill_on)
            .finish_non_exhaustive()
    }
}

/// What part of a guarded resource a rule constrains.
///
/// Used only by the encoder (see [`crate::encode`]) to group a policy's
/// rules the way downstream consumers read them back; evaluation ignores
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGroup {
    /// Guards the resource identifier.
    Id,
    /// Guards the resource type.
    Type,
    /// Guards the named attribute.
    Attribute(String),
    /// Guards the named to-one relationship.
    ToOne(String),
    /// Guards the named to-many relationship.
    ToMany(String),
}

/// An authorization rule: target → condition → effect.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    id: Option<String>,
    target: Option<Target>,
    condition: Logical,
    effect: Logical,
    obligations: Vec<Obligation>,
    advice: Vec<Advice>,
    group: Option<RuleGroup>,
}

impl Rule {
    /// Create a rule that matches everything and permits unconditionally.
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

    /// Set the condition. Defaults to always-true.
    pub fn with_condition(mut self, condition: Logical) -> Self {
        self.condition = condition;
        self
    }

    /// Set the effect.
    ///
    /// The default effect is [`Logical::always`], a PERMIT-shaped rule. Use
    /// [`Logical::never`] or a closure returning `false` to express a
    /// DENY-shaped rule.
    pub fn with_effect(mut self, effect: Logical) -> Self {
        self.effect = effect;
        self
    }

    /// Attach an obligation.
    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Attach advice.
    pub fn with_advice(mut self, advice: Advice) -> Self {
        self.advice.push(advice);
        self
    }

    /// Set the encoder grouping for this rule.
    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.group = Some(group);
        self
    }

    /// The rule identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The applicability target, if one was set.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// The condition.
    pub fn condition(&self) -> &Logical {
        &self.condition
    }

    /// The effect.
    pub fn effect(&self) -> &Logical {
        &self.effect
    }

    /// Attached obligations.
    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Attached advice.
    pub fn advice(&self) -> &[Advice] {
        &self.advice
    }

    /// The encoder grouping, if set.
    pub fn group(&self) -> Option<&RuleGroup> {
        self.group.as_ref()
    }
}
