//! Eunomia PDP - XACML-style Policy Decision Point
//!
//! This crate evaluates attribute-based access-control policies against
//! request contexts and produces PERMIT / DENY / INDETERMINATE /
//! NOT_APPLICABLE decisions, together with the obligations and advice
//! collected along the winning path.
//!
//! # Architecture
//!
//! ```text
//!            authoring                     evaluation (hot path)
//!   ┌──────────────────────────┐
//!   │ PolicySet / Policy / Rule│
//!   │ (tree, fluent setters)   │
//!   └──────────┬───────────────┘
//!              │ compile() / optimize()   one-time tree walk
//!   ┌──────────▼───────────────┐
//!   │ PolicyPlan / RulePlan    │   Request ──► Context (per request,
//!   │ targets ∥ bodies + fold  │             │  memoized attributes)
//!   └──────────┬───────────────┘             │
//!              │ evaluate(&Context) ◄────────┘
//!              ▼
//!   (Decision, obligations, advice)
//! ```
//!
//! The authored tree can nest policy sets arbitrarily deep; `optimize()`
//! collapses it once into parallel target/body arrays plus one composed
//! fold closure per combining algorithm. The plan is immutable and shared
//! across threads; every per-request state lives in a [`Context`] built
//! for exactly one request.
//!
//! # Example
//!
//! ```
//! use eunomia_pdp::{
//!     Context, Decision, Logical, Policy, PolicySet, Request, Rule,
//!     RuleCombiningAlgorithm, Target,
//! };
//!
//! let policy = Policy::new()
//!     .with_id("reports")
//!     .with_algorithm(RuleCombiningAlgorithm::FirstApplicable)
//!     .with_rule(
//!         Rule::new()
//!             .with_target(Target::matching("action", "read"))
//!             .with_condition(Logical::attribute("vetted")),
//!     )
//!     .with_rule(Rule::new().with_effect(Logical::never()));
//!
//! let plan = PolicySet::new().with_child(policy).compile();
//!
//! let ctx = Context::new(Request::new().with_attribute("action", "read"))
//!     .with_attribute("vetted", true);
//! let (decision, _obligations, _advice) = plan.evaluate(&ctx);
//! assert_eq!(decision, Decision::Permit);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod cache;
pub mod combining;
pub mod config;
pub mod context;
pub mod decision;
pub mod encode;
pub mod error;
pub mod logical;
pub mod plan;
pub mod policy;
pub mod rule;
pub mod target;
pub mod trace;

// Re-exports for convenience
pub use attribute::{AttributeBag, AttributeResolver, AttributeStore, AttributeValue};
pub use cache::{CacheConfig, CacheStats, DecisionCache};
pub use combining::{PolicyCombiningAlgorithm, RuleCombiningAlgorithm};
pub use config::PdpConfig;
pub use context::{Context, Request};
pub use decision::{AdviceHandler, Decision, ObligationHandler, Outcome};
pub use encode::{encode_policy, encode_policy_set, encode_rule, Encoded, EncodedBlock};
pub use error::{PdpError, PdpResult};
pub use logical::Logical;
pub use plan::{PolicyPlan, RulePlan};
pub use policy::{Policy, PolicyChild, PolicySet};
pub use rule::{Advice, Obligation, Rule, RuleGroup};
pub use target::{AllOf, Target};
pub use trace::{CollectingTrace, DecisionTrace, NoopTrace, TracingTrace};

use std::time::Instant;

/// Main decision point facade.
///
/// Combines a compiled policy plan with decision caching and
/// configuration. The facade is `Send + Sync`: one instance serves
/// arbitrarily many concurrent requests, each with its own [`Context`].
#[derive(Debug)]
pub struct DecisionPoint {
    /// The compiled execution plan.
    plan: PolicyPlan,
    /// Decision cache.
    cache: DecisionCache,
    /// Configuration.
    config: PdpConfig,
}

impl DecisionPoint {
    /// Compile a policy set into a decision point with the given
    /// configuration.
    pub fn new(set: &PolicySet, config: PdpConfig) -> Self {
        let plan = set.compile();
        let cache = DecisionCache::new(config.cache_config.clone());
        Self {
            plan,
            cache,
            config,
        }
    }

    /// Compile a policy set with default configuration.
    pub fn with_defaults(set: &PolicySet) -> Self {
        Self::new(set, PdpConfig::default())
    }

    /// Evaluate a request.
    ///
    /// Consults the cache first; on a miss, builds a [`Context`] from the
    /// request and secondary attributes, runs the plan, and caches the
    /// decision when it is safe to replay. The cache key covers only the
    /// request bag, so a decision is cached only when evaluation never
    /// consulted the secondary store and the decision is settled. Always
    /// returns a well-formed outcome, never an error: failures inside
    /// user-supplied callables have been folded into `INDETERMINATE*`
    /// decisions.
    pub fn decide(&self, request: Request, attributes: AttributeStore) -> Outcome {
        if let Some(decision) = self.cache.get(&request) {
            tracing::debug!(
                policy_id = %self.config.default_policy_id,
                decision = ?decision,
                cached = true,
                "returning cached decision"
            );
            return (decision, Vec::new(), Vec::new());
        }

        let ctx = Context::new(request).with_attributes(attributes);
        let start = Instant::now();

        let outcome = if self.config.trace_indeterminate {
            self.plan.evaluate_with_trace(&ctx, Some(&TracingTrace))
        } else {
            self.plan.evaluate(&ctx)
        };

        tracing::debug!(
            policy_id = %self.config.default_policy_id,
            decision = ?outcome.0,
            elapsed_us = start.elapsed().as_micros() as u64,
            "policy evaluation complete"
        );

        if !ctx.secondary_consulted() && self.cache.should_cache(&outcome) {
            self.cache.insert(ctx.request(), outcome.0);
        }

        outcome
    }

    /// The compiled plan.
    pub fn plan(&self) -> &PolicyPlan {
        &self.plan
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Clear the decision cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
