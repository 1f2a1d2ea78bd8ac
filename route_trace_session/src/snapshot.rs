use route_trace_lib::{coordinates::Coordinates, navigation_data::NavigationData, route_summary::RouteType, stop::{Stop, StopId}};
use serde::{Deserialize, Serialize};

use crate::{metrics, phase::{Dialog, DialogFlags, NavigationMode, SessionPhase}};

/// Read-only view of a session, published after every accepted command.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub epoch: u64,
    pub phase: SessionPhase,
    pub stops: Vec<Stop>,
    pub navigation_data: NavigationData,
    pub estimated_credits: u32,
    pub route_type: Option<RouteType>,
    pub center_pin: Option<Coordinates>,
    pub dialogs: DialogFlags,
}

impl SessionSnapshot {
    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    pub fn current_stop(&self) -> Option<&Stop> {
        if self.phase.is_in_active_navigation() {
            self.stops.get(self.navigation_data.current_stop_index)
        } else {
            None
        }
    }

    pub fn completed_stops(&self) -> usize {
        self.stops.iter().filter(|stop| stop.is_completed).count()
    }

    pub fn progress_percent(&self) -> f64 {
        metrics::progress_percent(self.completed_stops(), self.stops.len())
    }

    pub fn is_tracing(&self) -> bool {
        self.phase.is_tracing()
    }

    pub fn is_in_preparation(&self) -> bool {
        self.phase.is_in_preparation()
    }

    pub fn show_confirm_dialog(&self) -> bool {
        self.phase.show_confirm_dialog()
    }

    pub fn show_trace_confirmed(&self) -> bool {
        self.phase.show_trace_confirmed()
    }

    pub fn is_route_traced(&self) -> bool {
        self.phase.is_route_traced()
    }

    pub fn is_navigating(&self) -> bool {
        self.phase.is_navigating()
    }

    pub fn is_in_active_navigation(&self) -> bool {
        self.phase.is_in_active_navigation()
    }

    pub fn is_paused(&self) -> bool {
        self.phase.is_paused()
    }

    pub fn all_stops_completed(&self) -> bool {
        self.phase.all_stops_completed()
    }

    pub fn navigation_mode(&self) -> Option<NavigationMode> {
        self.phase.navigation_mode()
    }

    pub fn show_details_modal(&self) -> bool {
        self.dialogs.is_open(Dialog::Details)
    }

    pub fn show_adjustments_modal(&self) -> bool {
        self.dialogs.is_open(Dialog::Adjustments)
    }

    pub fn show_final_summary_modal(&self) -> bool {
        self.dialogs.is_open(Dialog::FinalSummary)
    }

    pub fn show_config_modal(&self) -> bool {
        self.dialogs.is_open(Dialog::Configuration)
    }
}
