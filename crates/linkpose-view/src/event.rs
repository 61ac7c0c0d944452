//! Notifications the positioning core sends to its callers.

/// Outcome shown next to the pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    /// The display shows the target's current pose.
    ActualState,
    /// A link pose input was solved and committed.
    Solved,
    /// A link pose input could not be solved; the body was rolled back.
    NotSolved,
    /// An edit target took the entered pose.
    Accepted,
    /// An edit target refused the entered pose.
    NotAccepted,
}

impl ResultStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ActualState => "Actual State",
            Self::Solved => "Solved",
            Self::NotSolved => "Not Solved",
            Self::Accepted => "Accepted",
            Self::NotAccepted => "Not Accepted",
        }
    }

    /// Whether the status should be styled as an error.
    pub const fn is_error(self) -> bool {
        matches!(self, Self::NotSolved | Self::NotAccepted)
    }

    pub(crate) const fn from_solved(solved: bool) -> Self {
        if solved {
            Self::Solved
        } else {
            Self::NotSolved
        }
    }

    pub(crate) const fn from_accepted(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::NotAccepted
        }
    }
}

/// What changed in the core. Handlers read the new state back from the
/// core after the call that triggered the event returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPositionEvent {
    /// Target link, body or edit target changed.
    TargetChanged,
    /// Enabled state of interface parts changed.
    InterfaceChanged,
    /// The coordinate mode changed.
    CoordinateModeChanged,
    /// Base or link frame candidates were rebuilt or reselected.
    FrameCandidatesChanged,
    /// The display pose was recomputed.
    DisplayChanged,
    /// A new result status is shown.
    ResultChanged(ResultStatus),
    /// The current configuration label changed.
    ConfigurationLabelChanged,
    /// The configuration table was rebuilt, retried, sorted or filtered.
    ConfigurationTableChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_display_text() {
        assert_eq!(ResultStatus::ActualState.label(), "Actual State");
        assert_eq!(ResultStatus::from_solved(true).label(), "Solved");
        assert_eq!(ResultStatus::from_solved(false).label(), "Not Solved");
        assert_eq!(ResultStatus::from_accepted(true).label(), "Accepted");
        assert_eq!(ResultStatus::from_accepted(false).label(), "Not Accepted");
    }

    #[test]
    fn only_failures_are_errors() {
        assert!(ResultStatus::NotSolved.is_error());
        assert!(ResultStatus::NotAccepted.is_error());
        assert!(!ResultStatus::Solved.is_error());
        assert!(!ResultStatus::ActualState.is_error());
    }
}
