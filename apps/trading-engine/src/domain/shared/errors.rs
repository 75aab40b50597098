//! Domain errors for the trading engine.

use std::fmt;

/// Domain-level errors that can occur in business logic.
///
/// These errors are independent of infrastructure concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Entity type (e.g., "Position").
        entity: String,
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },

    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { entity, from, to } => {
                write!(f, "Invalid state transition for {entity}: {from} -> {to}")
            }
            Self::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_invalid_value_display() {
        let err = DomainError::invalid("leverage", "must be between 1 and 125");
        let msg = format!("{err}");
        assert!(msg.contains("leverage"));
        assert!(msg.contains("125"));
    }

    #[test]
    fn domain_error_invalid_state_transition_display() {
        let err = DomainError::InvalidStateTransition {
            entity: "Position".to_string(),
            from: "FLAT".to_string(),
            to: "CLOSING".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("FLAT -> CLOSING"));
    }

    #[test]
    fn domain_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(DomainError::invalid("test", "test"));
        assert!(!err.to_string().is_empty());
    }
}
