//! Error taxonomy for storehouse operations.
//!
//! Five kinds of failure cross the repository boundary:
//! - [`StoreError::NotFound`]: an id or name resolved to nothing
//! - [`StoreError::Validation`]: missing/empty required input, caught before storage is touched
//! - [`StoreError::InvalidIdentifier`]: a derived table name failed the identifier grammar;
//!   treated as a hard stop so no unsafe schema statement is ever issued
//! - [`StoreError::Conflict`]: a uniqueness clash (identifier already claimed, rename target exists)
//! - [`StoreError::Storage`]: transaction/constraint failure surfaced by the engine, with the
//!   engine-provided detail attached

use std::fmt;

/// Error type for all storehouse operations
#[derive(Debug)]
pub enum StoreError {
    /// A category, item, or unit could not be resolved
    NotFound(String),
    /// Required input is missing or empty
    Validation(String),
    /// A derived table identifier failed the `[a-zA-Z_][a-zA-Z0-9_]*` grammar
    InvalidIdentifier(String),
    /// The operation clashed with existing state (e.g. identifier already claimed)
    Conflict(String),
    /// Storage-engine failure, with the original message attached for diagnostics
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(s) => write!(f, "not found: {s}"),
            StoreError::Validation(s) => write!(f, "validation error: {s}"),
            StoreError::InvalidIdentifier(s) => write!(f, "invalid identifier: {s}"),
            StoreError::Conflict(s) => write!(f, "conflict: {s}"),
            StoreError::Storage(s) => write!(f, "storage error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// True for failures that stem from a race two concurrent requests can
    /// have on the same derived identifier; callers may retry these.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_distinguishes_kinds() {
        assert!(StoreError::NotFound("category 7".into())
            .to_string()
            .contains("not found"));
        assert!(StoreError::Validation("name is required".into())
            .to_string()
            .contains("validation"));
        assert!(StoreError::InvalidIdentifier("a b!".into())
            .to_string()
            .contains("invalid identifier"));
        assert!(StoreError::Conflict("ident taken".into())
            .to_string()
            .contains("conflict"));
        assert!(StoreError::Storage("duplicate key".into())
            .to_string()
            .contains("duplicate key"));
    }

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(StoreError::Storage("deadlock".into()).is_retryable());
        assert!(!StoreError::Conflict("taken".into()).is_retryable());
        assert!(!StoreError::NotFound("x".into()).is_retryable());
    }
}
