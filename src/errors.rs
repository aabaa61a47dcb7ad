//! Error handling module
//!
//! Unifies the errors of every layer behind [`GateError`].

use index_gate_acl::AclError;
use index_gate_policy_center::PolicyError;
use index_gate_request_context::ContextError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("rule configuration: {0}")]
    Acl(#[from] AclError),

    #[error("request context: {0}")]
    Context(#[from] ContextError),

    #[error("settings: {0}")]
    Settings(#[from] PolicyError),
}

impl GateError {
    /// Fatal errors abort the evaluation instead of degrading to a denial.
    pub fn is_fatal(&self) -> bool {
        match self {
            GateError::Context(err) => err.is_fatal(),
            _ => true,
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            GateError::Context(ContextError::PermissionDenied { .. })
            | GateError::Context(ContextError::EmptyIndices) => 3,
            GateError::Acl(_) | GateError::Settings(_) => 2,
            GateError::Context(ContextError::NotIndicesRequest { .. }) => 1,
            GateError::Context(ContextError::IndicesNotReplaced { .. }) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_failures_are_recoverable() {
        let err = GateError::from(ContextError::IndicesNotReplaced {
            type_name: "BulkRequest".into(),
            causes: Vec::new(),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), 0);
    }

    #[test]
    fn contract_violations_are_fatal() {
        let err = GateError::from(ContextError::EmptyIndices);
        assert!(err.is_fatal());
        assert_eq!(err.severity(), 3);

        let err = GateError::from(PolicyError::TooManyRules {
            max: 1,
            attempted: 2,
        });
        assert!(err.is_fatal());
        assert_eq!(err.severity(), 2);
    }
}
