//! Per-symbol position lifecycle: FLAT -> OPEN -> CLOSING -> FLAT.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// Lifecycle state of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    /// No position.
    Flat,
    /// Position confirmed open.
    Open,
    /// Reduce-only order submitted, waiting for flat.
    Closing,
}

impl LifecycleState {
    /// Check if a state transition is valid.
    ///
    /// `Closing -> Open` covers an exhausted close: the position stays open
    /// and is retried next tick.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Flat, Self::Open)
                | (Self::Open, Self::Closing)
                | (Self::Closing, Self::Flat)
                | (Self::Closing, Self::Open)
        )
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not part of the lifecycle.
    pub fn transition(self, to: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidStateTransition {
                entity: "Position".to_string(),
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::Open => write!(f, "OPEN"),
            Self::Closing => write!(f, "CLOSING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LifecycleState::Flat, LifecycleState::Open, true)]
    #[test_case(LifecycleState::Open, LifecycleState::Closing, true)]
    #[test_case(LifecycleState::Closing, LifecycleState::Flat, true)]
    #[test_case(LifecycleState::Closing, LifecycleState::Open, true)]
    #[test_case(LifecycleState::Flat, LifecycleState::Closing, false)]
    #[test_case(LifecycleState::Open, LifecycleState::Flat, false)]
    #[test_case(LifecycleState::Open, LifecycleState::Open, false)]
    fn transitions(from: LifecycleState, to: LifecycleState, valid: bool) {
        assert_eq!(from.can_transition_to(to), valid);
        assert_eq!(from.transition(to).is_ok(), valid);
    }
}
