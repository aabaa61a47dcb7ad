use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("unsupported settings path: {0}")]
    UnsupportedPath(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
    #[error("settings exceed maximum {max} rules (attempted: {attempted})")]
    TooManyRules { max: usize, attempted: usize },
}

impl PolicyError {
    pub(crate) fn rule(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}
