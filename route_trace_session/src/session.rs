use chrono::{DateTime, Duration, Utc};
use route_trace_lib::{
    coordinates::Coordinates,
    navigation_data::{NavigationData, NavigationDataPatch},
    route_summary::{CompletedRouteSummary, RouteType},
    stop::{Stop, StopId},
};

use crate::{
    adapters::{OptimizeOptions, OptimizedRoute},
    config::SessionConfig,
    effect::{Effect, OptimizationRequest},
    error::{AbortReason, Rejection, ValidationError},
    metrics::{self, RemainingDistanceModel},
    phase::{Dialog, DialogFlags, SessionPhase},
    registry::{StopDetails, StopRegistry},
    snapshot::SessionSnapshot,
};

/// Minimum gap between two suggested re-optimizations.
pub const SUGGESTION_COOLDOWN_MINUTES: i64 = 5;
pub const MAX_OPTIMIZATIONS_PER_ROUTE: u32 = 5;

/// The parts of the configuration the state machine itself needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub default_center: Coordinates,
    pub remaining_distance_model: RemainingDistanceModel,
    pub optimize_options: OptimizeOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            default_center: config.default_center,
            remaining_distance_model: config.remaining_distance_model,
            optimize_options: config.optimize_options,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartTracing,
    EnterPreparation,
    LeavePreparation,
    SetRouteType(RouteType),
    CenterChanged(Coordinates),

    AddStop { id: StopId, coordinates: Coordinates, name: Option<String>, address: Option<String> },
    AddressResolved { epoch: u64, stop_id: StopId, address: String },
    RemoveLastStop,
    RemoveStop(StopId),
    ClearAllStops,
    ReorderStop { from: usize, to: usize },
    UpdateStopDetails { id: StopId, details: StopDetails },

    ShowTraceConfirmation,
    HideTraceConfirmation,
    ConfirmTrace,
    CancelTrace,

    StartActiveNavigation,
    StopActiveNavigation,
    PauseNavigation,
    ResumeNavigation,
    CompleteCurrentStop,
    OptimizeRoute,
    OptimizationFinished { request: OptimizationRequest, route: OptimizedRoute },
    UpdateNavigationData(NavigationDataPatch),
    Tick,

    GiveUpNavigation,
    EndRoute,
    SaveAndCompleteRoute,

    OpenDialog(Dialog),
    CloseDialog(Dialog),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartTracing => "start_tracing",
            Command::EnterPreparation => "enter_preparation",
            Command::LeavePreparation => "leave_preparation",
            Command::SetRouteType(_) => "set_route_type",
            Command::CenterChanged(_) => "center_changed",
            Command::AddStop { .. } => "add_stop",
            Command::AddressResolved { .. } => "address_resolved",
            Command::RemoveLastStop => "remove_last_stop",
            Command::RemoveStop(_) => "remove_stop",
            Command::ClearAllStops => "clear_all_stops",
            Command::ReorderStop { .. } => "reorder_stop",
            Command::UpdateStopDetails { .. } => "update_stop_details",
            Command::ShowTraceConfirmation => "show_trace_confirmation",
            Command::HideTraceConfirmation => "hide_trace_confirmation",
            Command::ConfirmTrace => "confirm_trace",
            Command::CancelTrace => "cancel_trace",
            Command::StartActiveNavigation => "start_active_navigation",
            Command::StopActiveNavigation => "stop_active_navigation",
            Command::PauseNavigation => "pause_navigation",
            Command::ResumeNavigation => "resume_navigation",
            Command::CompleteCurrentStop => "complete_current_stop",
            Command::OptimizeRoute => "optimize_route",
            Command::OptimizationFinished { .. } => "optimization_finished",
            Command::UpdateNavigationData(_) => "update_navigation_data",
            Command::Tick => "tick",
            Command::GiveUpNavigation => "give_up_navigation",
            Command::EndRoute => "end_route",
            Command::SaveAndCompleteRoute => "save_and_complete_route",
            Command::OpenDialog(_) => "open_dialog",
            Command::CloseDialog(_) => "close_dialog",
        }
    }
}

type Outcome = Result<Vec<Effect>, Rejection>;

/// Single owner of one planning-and-navigation cycle.
///
/// Every command is validated against the current phase and applied synchronously.
/// A rejected command leaves the session exactly as it was. Work that has to wait on
/// the network is returned as [`Effect`]s and its result comes back as another command.
#[derive(Debug, Clone)]
pub struct TraceSession {
    settings: SessionSettings,
    phase: SessionPhase,
    registry: StopRegistry,
    navigation: NavigationData,
    route_type: Option<RouteType>,
    center_pin: Option<Coordinates>,
    dialogs: DialogFlags,
    /// Bumped on every full reset. Results of requests from an older epoch are dropped.
    epoch: u64,
    /// Start of the currently running, unpaused stretch of navigation.
    active_since: Option<DateTime<Utc>>,
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl TraceSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            phase: SessionPhase::Idle,
            registry: StopRegistry::new(),
            navigation: NavigationData::default(),
            route_type: None,
            center_pin: None,
            dialogs: DialogFlags::default(),
            epoch: 0,
            active_since: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn stops(&self) -> &[Stop] {
        self.registry.stops()
    }

    pub fn navigation_data(&self) -> &NavigationData {
        &self.navigation
    }

    pub fn estimated_credits(&self) -> u32 {
        self.registry.estimated_credits()
    }

    pub fn dialogs(&self) -> DialogFlags {
        self.dialogs
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            epoch: self.epoch,
            phase: self.phase,
            stops: self.registry.stops().to_vec(),
            navigation_data: self.navigation.clone(),
            estimated_credits: self.registry.estimated_credits(),
            route_type: self.route_type,
            center_pin: self.center_pin,
            dialogs: self.dialogs,
        }
    }

    pub fn apply(&mut self, command: Command, now: DateTime<Utc>) -> Outcome {
        let name = command.name();
        let outcome = self.dispatch(command, now);
        self.log_outcome(name, outcome.as_ref().err());
        outcome
    }

    /// Accepts an optimization and hands back what the optimizer should be given.
    pub fn request_optimization(&mut self) -> Result<OptimizationRequest, Rejection> {
        let request = self.optimize_route();
        self.log_outcome(Command::OptimizeRoute.name(), request.as_ref().err());
        request
    }

    fn log_outcome(&self, name: &'static str, rejection: Option<&Rejection>) {
        match rejection {
            None => tracing::trace!("{} applied, now {}", name, self.phase),
            Some(rejection @ Rejection::InvalidPhase { .. }) => tracing::debug!("Ignored: {rejection}"),
            Some(Rejection::Validation(err)) => tracing::info!("{} rejected: {} ({})", name, err, err.reason_code()),
            Some(Rejection::Aborted(reason)) => tracing::debug!("{} dropped: {}", name, reason),
        }
    }

    fn dispatch(&mut self, command: Command, now: DateTime<Utc>) -> Outcome {
        match command {
            Command::StartTracing => self.start_tracing(),
            Command::EnterPreparation => self.transition("enter_preparation", SessionPhase::Tracing, SessionPhase::Preparing),
            Command::LeavePreparation => self.transition("leave_preparation", SessionPhase::Preparing, SessionPhase::Tracing),
            Command::SetRouteType(route_type) => self.set_route_type(route_type),
            Command::CenterChanged(coordinates) => self.center_changed(coordinates),

            Command::AddStop { id, coordinates, name, address } => self.add_stop(id, coordinates, name, address),
            Command::AddressResolved { epoch, stop_id, address } => self.address_resolved(epoch, stop_id, address),
            Command::RemoveLastStop => self.remove_last_stop(),
            Command::RemoveStop(id) => self.remove_stop(id),
            Command::ClearAllStops => self.clear_all_stops(),
            Command::ReorderStop { from, to } => self.reorder_stop(from, to),
            Command::UpdateStopDetails { id, details } => self.update_stop_details(id, details),

            Command::ShowTraceConfirmation => self.show_trace_confirmation(),
            Command::HideTraceConfirmation => self.transition("hide_trace_confirmation", SessionPhase::ConfirmPending, SessionPhase::Tracing),
            Command::ConfirmTrace => self.confirm_trace(),
            Command::CancelTrace => self.cancel_trace(),

            Command::StartActiveNavigation => self.start_active_navigation(now),
            Command::StopActiveNavigation => self.stop_active_navigation(now),
            Command::PauseNavigation => self.set_paused(true, now),
            Command::ResumeNavigation => self.set_paused(false, now),
            Command::CompleteCurrentStop => self.complete_current_stop(now),
            Command::OptimizeRoute => self.optimize_route().map(|request| vec![Effect::OptimizeRoute(request)]),
            Command::OptimizationFinished { request, route } => self.optimization_finished(request, route, now),
            Command::UpdateNavigationData(patch) => self.update_navigation_data(patch),
            Command::Tick => self.tick(now),

            Command::GiveUpNavigation => self.give_up_navigation(),
            Command::EndRoute => self.end_route(),
            Command::SaveAndCompleteRoute => self.save_and_complete_route(now),

            Command::OpenDialog(dialog) => self.set_dialog(dialog, true),
            Command::CloseDialog(dialog) => self.set_dialog(dialog, false),
        }
    }

    /// Whether now is a good moment to re-optimize the remaining stops.
    pub fn should_suggest_optimization(&self, now: DateTime<Utc>) -> bool {
        if !self.phase.is_in_active_navigation() {
            return false;
        }

        let completed = self.registry.completed_count();
        let remaining = self.registry.len() - completed;
        let cooled_down = self.navigation.last_optimization_time
            .map(|last| now - last > Duration::minutes(SUGGESTION_COOLDOWN_MINUTES))
            .unwrap_or(true);

        remaining >= 3
            && completed >= 1
            && cooled_down
            && self.navigation.optimization_count < MAX_OPTIMIZATIONS_PER_ROUTE
    }

    fn invalid(&self, command: &'static str) -> Outcome {
        Err(Rejection::InvalidPhase { command, phase: self.phase })
    }

    fn transition(&mut self, command: &'static str, from: SessionPhase, to: SessionPhase) -> Outcome {
        if self.phase != from {
            return self.invalid(command);
        }
        self.phase = to;
        Ok(Vec::new())
    }

    fn start_tracing(&mut self) -> Outcome {
        if self.phase != SessionPhase::Idle {
            return self.invalid("start_tracing");
        }

        self.phase = SessionPhase::Tracing;
        self.registry.clear();
        self.navigation = NavigationData::default();
        self.center_pin = Some(self.settings.default_center);
        self.route_type = Some(RouteType::Temporary);
        tracing::info!("Tracing started");
        Ok(Vec::new())
    }

    fn set_route_type(&mut self, route_type: RouteType) -> Outcome {
        if !matches!(self.phase, SessionPhase::Tracing | SessionPhase::Preparing) {
            return self.invalid("set_route_type");
        }
        self.route_type = Some(route_type);
        Ok(Vec::new())
    }

    fn center_changed(&mut self, coordinates: Coordinates) -> Outcome {
        if self.phase != SessionPhase::Tracing {
            return self.invalid("center_changed");
        }
        self.center_pin = Some(coordinates);
        Ok(Vec::new())
    }

    /// Stop edits are refused once a confirmed route has progress, completed stops are history.
    fn ensure_editable(&self, command: &'static str, allowed: bool) -> Result<(), Rejection> {
        if !allowed {
            return Err(Rejection::InvalidPhase { command, phase: self.phase });
        }
        if self.registry.completed_count() > 0 {
            return Err(ValidationError::RouteInProgress.into());
        }
        Ok(())
    }

    fn add_stop(&mut self, id: StopId, coordinates: Coordinates, name: Option<String>, address: Option<String>) -> Outcome {
        self.ensure_editable("add_stop", self.phase.accepts_stop_edits())?;

        let needs_address = address.is_none();
        let stop = self.registry.push(id, coordinates, name, address)?;
        tracing::debug!("Added {} ({}) as stop {}", stop.name, stop.id, stop.order);
        let stop_id = stop.id.clone();
        self.refresh_planned_distances();

        let mut effects = Vec::new();
        if needs_address {
            effects.push(Effect::ResolveAddress {
                epoch: self.epoch,
                stop_id,
                coordinates,
            });
        }
        Ok(effects)
    }

    fn address_resolved(&mut self, epoch: u64, stop_id: StopId, address: String) -> Outcome {
        if epoch != self.epoch {
            return Err(Rejection::Aborted(AbortReason::SessionReset));
        }
        if !self.registry.set_address(&stop_id, address) {
            return Err(Rejection::Aborted(AbortReason::StopRemoved));
        }
        Ok(Vec::new())
    }

    fn remove_last_stop(&mut self) -> Outcome {
        self.ensure_editable("remove_last_stop", self.phase.accepts_stop_removal())?;
        if self.registry.remove_last().is_none() {
            return Err(ValidationError::NoStops.into());
        }
        Ok(self.stops_changed())
    }

    fn remove_stop(&mut self, id: StopId) -> Outcome {
        self.ensure_editable("remove_stop", self.phase.accepts_stop_removal())?;
        if self.registry.remove_by_id(&id).is_none() {
            return Err(ValidationError::UnknownStop(id).into());
        }
        Ok(self.stops_changed())
    }

    fn clear_all_stops(&mut self) -> Outcome {
        self.ensure_editable("clear_all_stops", self.phase.accepts_stop_removal())?;
        self.registry.clear();
        Ok(self.stops_changed())
    }

    fn reorder_stop(&mut self, from: usize, to: usize) -> Outcome {
        self.ensure_editable("reorder_stop", self.phase.accepts_stop_edits())?;
        self.registry.reorder(from, to)?;
        Ok(self.stops_changed())
    }

    fn update_stop_details(&mut self, id: StopId, details: StopDetails) -> Outcome {
        if self.phase == SessionPhase::Idle {
            return self.invalid("update_stop_details");
        }
        self.registry.update_details(&id, details)?;
        Ok(Vec::new())
    }

    fn stops_changed(&mut self) -> Vec<Effect> {
        self.refresh_planned_distances();
        self.redraw_if_traced()
    }

    /// A stopped navigation has no completed stops here, so its figures are re-planned from scratch.
    fn refresh_planned_distances(&mut self) {
        if self.navigation.start_time.is_none() {
            return;
        }
        let total = metrics::estimate_total_distance(self.registry.stops());
        self.navigation.total_distance_meters = total;
        self.navigation.remaining_distance_meters = total;
        self.navigation.estimated_fuel_liters = metrics::estimate_fuel(total);
    }

    fn redraw_if_traced(&self) -> Vec<Effect> {
        if self.phase == SessionPhase::Traced {
            vec![Effect::DrawRoute { stops: self.registry.stops().to_vec() }]
        } else {
            Vec::new()
        }
    }

    fn show_trace_confirmation(&mut self) -> Outcome {
        if !matches!(self.phase, SessionPhase::Tracing | SessionPhase::Preparing) {
            return self.invalid("show_trace_confirmation");
        }
        if self.registry.is_empty() {
            return Err(ValidationError::NoStops.into());
        }
        self.phase = SessionPhase::ConfirmPending;
        Ok(Vec::new())
    }

    fn confirm_trace(&mut self) -> Outcome {
        if self.phase != SessionPhase::ConfirmPending {
            return self.invalid("confirm_trace");
        }
        if self.registry.is_empty() {
            return Err(ValidationError::NoStops.into());
        }

        self.phase = SessionPhase::Traced;
        tracing::info!("Trace confirmed with {} stops", self.registry.len());
        Ok(vec![Effect::DrawRoute { stops: self.registry.stops().to_vec() }])
    }

    fn cancel_trace(&mut self) -> Outcome {
        if !self.phase.accepts_stop_removal() {
            return self.invalid("cancel_trace");
        }
        tracing::info!("Trace cancelled");
        Ok(self.reset())
    }

    fn start_active_navigation(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.phase != SessionPhase::Traced {
            return self.invalid("start_active_navigation");
        }
        if self.registry.is_empty() {
            return Err(ValidationError::NoStops.into());
        }

        if self.navigation.start_time.is_none() {
            let total = metrics::estimate_total_distance(self.registry.stops());
            self.navigation.start_time = Some(now);
            self.navigation.total_distance_meters = total;
            self.navigation.remaining_distance_meters = total;
            self.navigation.estimated_fuel_liters = metrics::estimate_fuel(total);
            self.navigation.current_stop_index = 0;
            self.navigation.active_time_millis = 0;
            tracing::info!("Navigation started with {} stops, {:.0} m estimated", self.registry.len(), total);
        } else {
            tracing::info!("Navigation resumed at stop {}", self.navigation.current_stop_index + 1);
        }

        self.phase = SessionPhase::ActiveNavigation { paused: false };
        self.active_since = Some(now);
        Ok(Vec::new())
    }

    fn stop_active_navigation(&mut self, now: DateTime<Utc>) -> Outcome {
        if !self.phase.is_in_active_navigation() {
            return self.invalid("stop_active_navigation");
        }
        self.accumulate_active_time(now);
        self.active_since = None;
        self.phase = SessionPhase::Traced;
        Ok(Vec::new())
    }

    fn set_paused(&mut self, pause: bool, now: DateTime<Utc>) -> Outcome {
        let SessionPhase::ActiveNavigation { paused } = self.phase else {
            return self.invalid(if pause { "pause_navigation" } else { "resume_navigation" });
        };
        if paused == pause {
            return Ok(Vec::new());
        }

        if pause {
            self.accumulate_active_time(now);
            self.active_since = None;
        } else {
            self.active_since = Some(now);
        }
        self.phase = SessionPhase::ActiveNavigation { paused: pause };
        Ok(Vec::new())
    }

    fn accumulate_active_time(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.active_since {
            self.navigation.active_time_millis += metrics::elapsed_millis(since, now);
            self.active_since = Some(now);
        }
    }

    fn complete_current_stop(&mut self, now: DateTime<Utc>) -> Outcome {
        if !self.phase.is_in_active_navigation() {
            return self.invalid("complete_current_stop");
        }

        let index = self.navigation.current_stop_index;
        let len = self.registry.len();
        let Some(stop_id) = self.registry.stops().get(index).map(|stop| stop.id.clone()) else {
            return Err(ValidationError::StopIndexOutOfBounds { index, len }.into());
        };

        self.accumulate_active_time(now);
        self.registry.mark_completed(&stop_id, now);
        self.navigation.current_stop_index = index + 1;

        if let Some(start) = self.navigation.start_time {
            if let Some(average) = metrics::average_stop_time(start, now, self.registry.completed_count()) {
                self.navigation.average_stop_time_millis = average;
            }
        }

        if index + 1 == len {
            self.navigation.remaining_distance_meters = 0.0;
            self.phase = SessionPhase::AllStopsCompleted;
            self.active_since = None;
            self.dialogs.set(Dialog::FinalSummary, true);
            tracing::info!("All {} stops completed", len);
            return Ok(Vec::new());
        }

        self.navigation.remaining_distance_meters = self.settings.remaining_distance_model.remaining(
            self.navigation.total_distance_meters,
            self.registry.stops(),
            self.navigation.current_stop_index,
        );
        self.phase = SessionPhase::ActiveNavigation { paused: false };
        self.active_since = Some(now);
        tracing::info!("Stop {}/{} completed", index + 1, len);

        Ok(vec![Effect::DrawRoute { stops: self.registry.stops()[index + 1..].to_vec() }])
    }

    /// Offset of the stops the optimizer may reorder.
    fn optimization_offset(&self) -> usize {
        if self.phase.is_in_active_navigation() {
            self.navigation.current_stop_index
        } else {
            0
        }
    }

    fn optimize_route(&mut self) -> Result<OptimizationRequest, Rejection> {
        if self.phase.is_in_active_navigation() {
            if !self.phase.accepts_optimization() {
                return Err(Rejection::InvalidPhase { command: "optimize_route", phase: self.phase });
            }
        } else {
            self.ensure_editable("optimize_route", self.phase.accepts_optimization())?;
        }

        let offset = self.optimization_offset();
        let stops = self.registry.stops()[offset..].to_vec();
        if stops.len() < 2 {
            return Err(ValidationError::NotEnoughStopsToOptimize { available: stops.len() }.into());
        }

        tracing::info!("Optimizing {} stops", stops.len());
        Ok(OptimizationRequest {
            epoch: self.epoch,
            offset,
            stop_ids: self.registry.ids(offset),
            stops,
            options: self.settings.optimize_options,
        })
    }

    fn optimization_finished(&mut self, request: OptimizationRequest, route: OptimizedRoute, now: DateTime<Utc>) -> Outcome {
        if request.epoch != self.epoch {
            return Err(Rejection::Aborted(AbortReason::SessionReset));
        }
        if !self.phase.accepts_optimization()
            || request.offset != self.optimization_offset()
            || request.stop_ids != self.registry.ids(request.offset)
        {
            return Err(Rejection::Aborted(AbortReason::RouteChanged));
        }
        if !self.registry.apply_permutation(request.offset, &route.ordered_waypoint_indices) {
            return Err(Rejection::Aborted(AbortReason::MalformedResult));
        }

        self.navigation.last_optimization_time = Some(now);
        self.navigation.optimization_count += 1;

        if let Some(distance) = route.distance_meters.filter(|distance| *distance >= 0.0) {
            self.navigation.total_distance_meters = distance;
            self.navigation.estimated_fuel_liters = metrics::estimate_fuel(distance);
            self.navigation.remaining_distance_meters = if self.phase.is_in_active_navigation() {
                self.settings.remaining_distance_model.remaining(distance, self.registry.stops(), self.navigation.current_stop_index)
            } else {
                distance
            };
        }

        tracing::info!("Route optimized ({} optimizations so far)", self.navigation.optimization_count);
        Ok(vec![Effect::DrawRoute { stops: self.registry.stops()[request.offset..].to_vec() }])
    }

    fn update_navigation_data(&mut self, patch: NavigationDataPatch) -> Outcome {
        if !self.phase.is_navigating() {
            return self.invalid("update_navigation_data");
        }
        if patch.has_negative() {
            return Err(ValidationError::NegativeQuantity.into());
        }

        if let Some(total) = patch.total_distance_meters {
            self.navigation.total_distance_meters = total;
        }
        if let Some(remaining) = patch.remaining_distance_meters {
            self.navigation.remaining_distance_meters = remaining;
        }
        if let Some(fuel) = patch.actual_fuel_liters {
            self.navigation.actual_fuel_liters = fuel;
        }
        Ok(Vec::new())
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Outcome {
        self.accumulate_active_time(now);
        Ok(Vec::new())
    }

    fn give_up_navigation(&mut self) -> Outcome {
        if !matches!(self.phase, SessionPhase::Traced | SessionPhase::ActiveNavigation { .. }) {
            return self.invalid("give_up_navigation");
        }
        tracing::info!("Navigation given up at stop {}/{}", self.navigation.current_stop_index, self.registry.len());
        Ok(self.reset())
    }

    fn end_route(&mut self) -> Outcome {
        if !self.phase.is_navigating() {
            return self.invalid("end_route");
        }
        let incomplete = self.registry.len() - self.registry.completed_count();
        if incomplete > 0 {
            tracing::info!("Route ended with {} stops not completed", incomplete);
        } else {
            tracing::info!("Route ended");
        }
        Ok(self.reset())
    }

    fn save_and_complete_route(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.phase != SessionPhase::AllStopsCompleted {
            return self.invalid("save_and_complete_route");
        }

        let summary = CompletedRouteSummary::new(
            now,
            self.registry.stops().to_vec(),
            self.navigation.clone(),
            self.route_type,
            self.registry.estimated_credits(),
        );
        tracing::info!("Route {} completed, saving", summary.route_id);

        let mut effects = vec![Effect::SaveCompletedRoute(Box::new(summary))];
        effects.extend(self.reset());
        Ok(effects)
    }

    fn set_dialog(&mut self, dialog: Dialog, open: bool) -> Outcome {
        self.dialogs.set(dialog, open);
        Ok(Vec::new())
    }

    fn reset(&mut self) -> Vec<Effect> {
        let settings = self.settings.clone();
        let epoch = self.epoch + 1;
        *self = Self::new(settings);
        self.epoch = epoch;
        vec![Effect::ResetMap]
    }
}
