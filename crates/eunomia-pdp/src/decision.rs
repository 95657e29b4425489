//! Decision values and the evaluation outcome shape.
//!
//! [`Decision`] is the closed result set of the PDP. The declaration order
//! matters: combining algorithms break ties by distinguishing the four
//! `Indeterminate*` shades, and the serialized names are part of the wire
//! vocabulary consumed by enforcement points.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;

/// The decision produced by evaluating a rule, policy, or policy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Access is granted.
    Permit,
    /// Access is refused.
    Deny,
    /// Nothing in scope applied to the request.
    NotApplicable,
    /// Evaluation failed and the potential decision is unknown.
    Indeterminate,
    /// Evaluation failed on an entity that could only have permitted.
    IndeterminatePermit,
    /// Evaluation failed on an entity that could only have denied.
    IndeterminateDeny,
    /// Evaluation failed and either decision was possible.
    IndeterminateDenyOrPermit,
}

impl Decision {
    /// Check if this is a concrete PERMIT or DENY.
    pub const fn is_concrete(self) -> bool {
        matches!(self, Self::Permit | Self::Deny)
    }

    /// Check if this is any of the indeterminate shades.
    pub const fn is_indeterminate(self) -> bool {
        matches!(
            self,
            Self::Indeterminate
                | Self::IndeterminatePermit
                | Self::IndeterminateDeny
                | Self::IndeterminateDenyOrPermit
        )
    }
}

/// A collected obligation callable.
///
/// Obligations are gathered by the combining algorithms, never executed by
/// the engine itself; the enforcement point runs them after the decision is
/// returned.
pub type ObligationHandler = Arc<dyn Fn(&Context) + Send + Sync>;

/// A collected advice callable. Same mechanics as [`ObligationHandler`],
/// but non-mandatory for the enforcement point.
pub type AdviceHandler = Arc<dyn Fn(&Context) + Send + Sync>;

/// The result of one evaluation: decision, obligations, advice.
///
/// The positional shape is deliberate and threaded unchanged through every
/// combining algorithm: position 0 is the decision, 1 the obligations, 2
/// the advice.
pub type Outcome = (Decision, Vec<ObligationHandler>, Vec<AdviceHandler>);

/// Shorthand for an outcome that carries no obligations or advice.
pub(crate) fn bare(decision: Decision) -> Outcome {
    (decision, Vec::new(), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_decisions() {
        assert!(Decision::Permit.is_concrete());
        assert!(Decision::Deny.is_concrete());
        assert!(!Decision::NotApplicable.is_concrete());
        assert!(!Decision::IndeterminateDenyOrPermit.is_concrete());
    }

    #[test]
    fn test_indeterminate_shades() {
        assert!(Decision::Indeterminate.is_indeterminate());
        assert!(Decision::IndeterminatePermit.is_indeterminate());
        assert!(Decision::IndeterminateDeny.is_indeterminate());
        assert!(Decision::IndeterminateDenyOrPermit.is_indeterminate());
        assert!(!Decision::NotApplicable.is_indeterminate());
        assert!(!Decision::Permit.is_indeterminate());
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&Decision::IndeterminateDenyOrPermit).unwrap();
        assert_eq!(json, "\"INDETERMINATE_DENY_OR_PERMIT\"");
        let back: Decision = serde_json::from_str("\"NOT_APPLICABLE\"").unwrap();
        assert_eq!(back, Decision::NotApplicable);
    }
}
