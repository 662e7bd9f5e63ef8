//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (lookups,
/// validation, lifecycle rules). Persistence concerns live in the storage crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An unknown asset id, part name, order id or request id was looked up.
    #[error("not found: {0}")]
    NotFound(String),

    /// An asset, part or policy registration reused an existing name.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A value failed validation (negative deltas, non-finite readings, blank names).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested change contradicts the current state (illegal lifecycle
    /// transition, order referencing a removed asset).
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_offending_value() {
        assert_eq!(
            DomainError::not_found("asset TR-009").to_string(),
            "not found: asset TR-009"
        );
        assert_eq!(
            DomainError::duplicate("part Foco delantero").to_string(),
            "duplicate name: part Foco delantero"
        );
        assert_eq!(
            DomainError::invalid("horometro delta must be non-negative").to_string(),
            "invalid input: horometro delta must be non-negative"
        );
    }
}
