//! Error types for the policy decision point.
//!
//! Failures raised by user-supplied condition, effect, and lazy-attribute
//! callables are values of [`PdpError`]. They are contained at the boundary
//! of the rule or policy that raised them and folded into an
//! `INDETERMINATE*` decision; they never surface to the evaluation caller
//! as an `Err`.

use thiserror::Error;

/// Result type for PDP operations.
pub type PdpResult<T> = Result<T, PdpError>;

/// Errors that can occur while resolving attributes or running
/// user-supplied callables.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PdpError {
    /// An attribute was requested that no bag provides.
    #[error("attribute not found: {name}")]
    AttributeNotFound {
        /// Name of the missing attribute.
        name: String,
    },

    /// A lazy attribute callable failed.
    #[error("failed to resolve attribute {name}: {message}")]
    Resolution {
        /// Name of the attribute being resolved.
        name: String,
        /// Error message from the callable.
        message: String,
    },

    /// A condition callable failed.
    #[error("condition evaluation failed: {0}")]
    Condition(String),

    /// An effect callable failed.
    #[error("effect evaluation failed: {0}")]
    Effect(String),

    /// An optimized plan was malformed.
    ///
    /// This signals a construction-time bug rather than a runtime request
    /// condition.
    #[error("malformed plan: {0}")]
    Plan(String),
}

impl PdpError {
    /// Create an attribute-not-found error.
    pub fn attribute_not_found(name: impl Into<String>) -> Self {
        Self::AttributeNotFound { name: name.into() }
    }

    /// Create a resolution error.
    pub fn resolution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a condition error.
    pub fn condition(message: impl Into<String>) -> Self {
        Self::Condition(message.into())
    }

    /// Create an effect error.
    pub fn effect(message: impl Into<String>) -> Self {
        Self::Effect(message.into())
    }

    /// Check if this error means an attribute was simply absent.
    pub const fn is_attribute_not_found(&self) -> bool {
        matches!(self, Self::AttributeNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_not_found() {
        let err = PdpError::attribute_not_found("role");
        assert!(err.is_attribute_not_found());
        assert_eq!(err.to_string(), "attribute not found: role");
    }

    #[test]
    fn test_resolution_error() {
        let err = PdpError::resolution("clearance", "directory unavailable");
        assert!(!err.is_attribute_not_found());
        assert!(err.to_string().contains("clearance"));
        assert!(err.to_string().contains("directory unavailable"));
    }

    #[test]
    fn test_condition_error_display() {
        let err = PdpError::condition("division by zero");
        assert_eq!(
            err.to_string(),
            "condition evaluation failed: division by zero"
        );
    }
}
