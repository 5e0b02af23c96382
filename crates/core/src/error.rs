//! Errors raised by the pure domain crates.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A business rule rejected an input or a state change.
///
/// Anything touching a database, the network or HTTP has its own error type
/// one layer up and wraps this one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (empty names, negative stock, bad email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state change would break an invariant, e.g. stock overflow on return.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidId(_) => "invalid_id",
            Self::NotFound => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DomainError::validation("x").code(), "validation_error");
        assert_eq!(DomainError::invariant("x").code(), "invariant_violation");
        assert_eq!(DomainError::invalid_id("x").code(), "invalid_id");
        assert_eq!(DomainError::NotFound.code(), "not_found");
    }
}
