//! Configuration for the decision point.

use crate::cache::CacheConfig;

/// Configuration for a [`crate::DecisionPoint`].
#[derive(Debug, Clone)]
pub struct PdpConfig {
    /// Default identifier used in diagnostics when a policy set has none.
    pub default_policy_id: String,
    /// Whether indeterminate occurrences are traced during evaluation.
    pub trace_indeterminate: bool,
    /// Cache configuration.
    pub cache_config: CacheConfig,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            default_policy_id: "pdp".to_string(),
            trace_indeterminate: true,
            cache_config: CacheConfig::default(),
        }
    }
}

impl PdpConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default policy identifier.
    pub fn with_policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.default_policy_id = policy_id.into();
        self
    }

    /// Enable or disable indeterminate tracing.
    pub fn with_trace_indeterminate(mut self, trace: bool) -> Self {
        self.trace_indeterminate = trace;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Create a production configuration.
    pub fn production() -> Self {
        Self {
            default_policy_id: "pdp".to_string(),
            trace_indeterminate: false,
            cache_config: CacheConfig::production(),
        }
    }

    /// Create a development configuration.
    pub fn development() -> Self {
        Self {
            default_policy_id: "pdp-dev".to_string(),
            trace_indeterminate: true,
            cache_config: CacheConfig::development(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PdpConfig::default();
        assert_eq!(config.default_policy_id, "pdp");
        assert!(config.trace_indeterminate);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PdpConfig::new()
            .with_policy_id("custom")
            .with_trace_indeterminate(false)
            .with_cache_config(CacheConfig::disabled());

        assert_eq!(config.default_policy_id, "custom");
        assert!(!config.trace_indeterminate);
        assert_eq!(config.cache_config.max_entries, 0);
    }

    #[test]
    fn test_presets() {
        assert!(!PdpConfig::production().trace_indeterminate);
        assert!(PdpConfig::development().trace_indeterminate);
        assert_eq!(PdpConfig::development().default_policy_id, "pdp-dev");
    }
}
