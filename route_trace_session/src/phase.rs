use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a trace. Exactly one is active, the flags the UI reads are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Tracing,
    Preparing,
    ConfirmPending,
    Traced,
    ActiveNavigation { paused: bool },
    AllStopsCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationMode {
    Traced,
    Active,
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Tracing => "tracing",
            SessionPhase::Preparing => "preparing",
            SessionPhase::ConfirmPending => "confirm pending",
            SessionPhase::Traced => "traced",
            SessionPhase::ActiveNavigation { paused: false } => "navigating",
            SessionPhase::ActiveNavigation { paused: true } => "paused",
            SessionPhase::AllStopsCompleted => "all stops completed",
        }
    }

    /// Drafting stops, before the trace is confirmed.
    pub fn is_tracing(&self) -> bool {
        matches!(self, SessionPhase::Tracing | SessionPhase::Preparing | SessionPhase::ConfirmPending)
    }

    pub fn is_in_preparation(&self) -> bool {
        matches!(self, SessionPhase::Preparing)
    }

    pub fn show_confirm_dialog(&self) -> bool {
        matches!(self, SessionPhase::ConfirmPending)
    }

    /// Confirmed and waiting for the operator to navigate or give up.
    pub fn show_trace_confirmed(&self) -> bool {
        matches!(self, SessionPhase::Traced)
    }

    pub fn is_route_traced(&self) -> bool {
        matches!(self, SessionPhase::Traced | SessionPhase::ActiveNavigation { .. } | SessionPhase::AllStopsCompleted)
    }

    pub fn is_navigating(&self) -> bool {
        matches!(self, SessionPhase::ActiveNavigation { .. } | SessionPhase::AllStopsCompleted)
    }

    pub fn is_in_active_navigation(&self) -> bool {
        matches!(self, SessionPhase::ActiveNavigation { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SessionPhase::ActiveNavigation { paused: true })
    }

    pub fn all_stops_completed(&self) -> bool {
        matches!(self, SessionPhase::AllStopsCompleted)
    }

    pub fn navigation_mode(&self) -> Option<NavigationMode> {
        match self {
            SessionPhase::Traced => Some(NavigationMode::Traced),
            SessionPhase::ActiveNavigation { .. } | SessionPhase::AllStopsCompleted => Some(NavigationMode::Active),
            _ => None,
        }
    }

    pub(crate) fn accepts_stop_edits(&self) -> bool {
        matches!(self, SessionPhase::Tracing | SessionPhase::Preparing | SessionPhase::Traced)
    }

    pub(crate) fn accepts_stop_removal(&self) -> bool {
        matches!(self, SessionPhase::Tracing | SessionPhase::Preparing | SessionPhase::ConfirmPending | SessionPhase::Traced)
    }

    pub(crate) fn accepts_optimization(&self) -> bool {
        self.accepts_stop_edits() || self.is_in_active_navigation()
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialog {
    Details,
    Adjustments,
    FinalSummary,
    Configuration,
}

/// Dialog visibility. Independent of the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DialogFlags {
    pub details: bool,
    pub adjustments: bool,
    pub final_summary: bool,
    pub configuration: bool,
}

impl DialogFlags {
    pub fn is_open(&self, dialog: Dialog) -> bool {
        match dialog {
            Dialog::Details => self.details,
            Dialog::Adjustments => self.adjustments,
            Dialog::FinalSummary => self.final_summary,
            Dialog::Configuration => self.configuration,
        }
    }

    /// Returns whether the flag changed.
    pub fn set(&mut self, dialog: Dialog, open: bool) -> bool {
        let flag = match dialog {
            Dialog::Details => &mut self.details,
            Dialog::Adjustments => &mut self.adjustments,
            Dialog::FinalSummary => &mut self.final_summary,
            Dialog::Configuration => &mut self.configuration,
        };
        let changed = *flag != open;
        *flag = open;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionPhase; 8] = [
        SessionPhase::Idle,
        SessionPhase::Tracing,
        SessionPhase::Preparing,
        SessionPhase::ConfirmPending,
        SessionPhase::Traced,
        SessionPhase::ActiveNavigation { paused: false },
        SessionPhase::ActiveNavigation { paused: true },
        SessionPhase::AllStopsCompleted,
    ];

    #[test]
    fn projections_never_contradict() {
        for phase in ALL {
            // Confirmed and still drafting can never both hold.
            assert!(!(phase.is_tracing() && phase.is_route_traced()), "{phase}");
            assert!(!(phase.show_trace_confirmed() && phase.is_navigating()), "{phase}");
            if phase.is_paused() {
                assert!(phase.is_in_active_navigation());
            }
            if phase.all_stops_completed() {
                assert!(!phase.is_in_active_navigation());
            }
        }
    }

    #[test]
    fn navigation_mode_follows_phase() {
        assert_eq!(SessionPhase::Tracing.navigation_mode(), None);
        assert_eq!(SessionPhase::Traced.navigation_mode(), Some(NavigationMode::Traced));
        assert_eq!(SessionPhase::ActiveNavigation { paused: true }.navigation_mode(), Some(NavigationMode::Active));
    }

    #[test]
    fn dialog_toggle_is_idempotent() {
        let mut flags = DialogFlags::default();
        assert!(flags.set(Dialog::Details, true));
        assert!(!flags.set(Dialog::Details, true));
        assert!(flags.is_open(Dialog::Details));
        assert!(!flags.is_open(Dialog::Adjustments));
        assert!(flags.set(Dialog::Details, false));
        assert!(!flags.set(Dialog::Details, false));
        assert_eq!(flags, DialogFlags::default());
    }
}
