/// Run state definitions for the crawl lifecycle
///
/// A run moves `Idle -> Running -> {Completed, Aborted}` and never leaves a terminal state.
use std::fmt;

/// Represents the lifecycle state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Configured but not started
    #[default]
    Idle,

    /// Workers are dispatching pages
    Running,

    /// Pagination ended or the page budget was used up
    Completed,

    /// Too many consecutive page failures
    Aborted,
}

impl RunState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Returns true if the transition `self -> next` is allowed
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Aborted.is_terminal());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(RunState::Idle.can_transition_to(RunState::Running));
        assert!(RunState::Running.can_transition_to(RunState::Completed));
        assert!(RunState::Running.can_transition_to(RunState::Aborted));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RunState::Idle.can_transition_to(RunState::Completed));
        assert!(!RunState::Completed.can_transition_to(RunState::Running));
        assert!(!RunState::Aborted.can_transition_to(RunState::Completed));
        assert!(!RunState::Running.can_transition_to(RunState::Idle));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::Aborted.to_string(), "aborted");
        assert_eq!(format!("{}", RunState::default()), "idle");
    }
}
