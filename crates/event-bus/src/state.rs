//! Bus lifecycle.

/// Lifecycle of an [`EventBus`](crate::EventBus).
///
/// State transitions:
/// ```text
/// Stopped ──start()──► Running ──stop()──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusState {
    /// No dispatch workers. Publishing fails with
    /// [`BusError::Stopped`](crate::BusError::Stopped).
    #[default]
    Stopped,

    /// Workers are draining the hand-off point.
    Running,
}

impl BusState {
    /// Returns true if published events can be accepted.
    pub fn accepts_events(&self) -> bool {
        matches!(self, BusState::Running)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusState::Stopped => "stopped",
            BusState::Running => "running",
        }
    }
}

impl std::fmt::Display for BusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stopped() {
        assert_eq!(BusState::default(), BusState::Stopped);
        assert!(!BusState::Stopped.accepts_events());
        assert!(BusState::Running.accepts_events());
    }

    #[test]
    fn display() {
        assert_eq!(BusState::Running.to_string(), "running");
        assert_eq!(BusState::Stopped.to_string(), "stopped");
    }
}
