//! Diagnostic sink for indeterminate outcomes during policy combination.
//!
//! Policy-level evaluation accepts an optional sink that records every
//! `INDETERMINATE*` a child contributes to the fold. The sink is purely a
//! diagnostic channel; it never affects the decision.

use crate::decision::Decision;

/// A sink recording indeterminate diagnostics.
pub trait DecisionTrace {
    /// Record that the named entity evaluated to an indeterminate decision.
    fn record(&self, entity: &str, decision: Decision);
}

/// A sink forwarding diagnostics to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl DecisionTrace for TracingTrace {
    fn record(&self, entity: &str, decision: Decision) {
        tracing::debug!(entity, decision = ?decision, "indeterminate during policy combination");
    }
}

/// A sink that discards diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl DecisionTrace for NoopTrace {
    fn record(&self, _entity: &str, _decision: Decision) {}
}

/// A sink collecting diagnostics in memory, for tests and audits.
#[derive(Debug, Default)]
pub struct CollectingTrace {
    records: std::sync::Mutex<Vec<(String, Decision)>>,
}

impl CollectingTrace {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded (entity, decision) pairs, in order.
    pub fn records(&self) -> Vec<(String, Decision)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DecisionTrace for CollectingTrace {
    fn record(&self, entity: &str, decision: Decision) {
        if let Ok(mut records) = self.records.lock() {
            records.push((entity.to_string(), decision));
        }
    }
}
