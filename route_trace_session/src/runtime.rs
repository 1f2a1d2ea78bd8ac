use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use route_trace_lib::{
    coordinates::Coordinates,
    navigation_data::NavigationDataPatch,
    route_summary::{CompletedRouteSummary, RouteType},
    stop::{Stop, StopId},
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    adapters::{optimize_within, resolve_or_fallback, AddressResolver, PersistenceSink, RouteOptimizer},
    config::SessionConfig,
    effect::{Effect, OptimizationRequest},
    error::{AbortReason, AdapterError, Rejection},
    notifier::{ListenerId, MapCollaborator, SessionResetNotifier},
    phase::Dialog,
    registry::StopDetails,
    session::{Command, SessionSettings, TraceSession},
    snapshot::SessionSnapshot,
};

/// What became of an `optimize_route` call that the session accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeOutcome {
    Applied { distance_meters: Option<f64> },
    /// The optimizer failed or timed out. The order is unchanged.
    Degraded(AdapterError),
    /// The result no longer matched the route and was dropped.
    Aborted(AbortReason),
}

/// Owns a [`TraceSession`] and performs the effects it asks for.
///
/// Commands are applied under a short lock that is never held across an `.await`,
/// so transitions never interleave. Every accepted command publishes a new snapshot.
#[derive(Clone)]
pub struct SessionRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    session: Mutex<TraceSession>,
    resolver: Arc<dyn AddressResolver>,
    optimizer: Arc<dyn RouteOptimizer>,
    persistence: Arc<dyn PersistenceSink>,
    notifier: SessionResetNotifier,
    snapshots: watch::Sender<SessionSnapshot>,
    geocode_timeout: Duration,
    optimize_timeout: Duration,
}

impl SessionRuntime {
    pub fn new(
        config: &SessionConfig,
        resolver: Arc<dyn AddressResolver>,
        optimizer: Arc<dyn RouteOptimizer>,
        persistence: Arc<dyn PersistenceSink>,
    ) -> Self {
        let session = TraceSession::new(SessionSettings::from(config));
        let (snapshots, _) = watch::channel(session.snapshot());

        Self {
            inner: Arc::new(RuntimeInner {
                session: Mutex::new(session),
                resolver,
                optimizer,
                persistence,
                notifier: SessionResetNotifier::new(),
                snapshots,
                geocode_timeout: config.geocode_timeout,
                optimize_timeout: config.optimize_timeout,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TraceSession> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn register_map(&self, map: Arc<dyn MapCollaborator>) -> ListenerId {
        self.inner.notifier.register(map)
    }

    pub fn unregister_map(&self, id: ListenerId) -> bool {
        self.inner.notifier.unregister(id)
    }

    /// Applies a command and starts its effects. Must be called within a tokio runtime.
    pub fn dispatch(&self, command: Command) -> Result<(), Rejection> {
        let effects = self.apply(command)?;
        for effect in effects {
            self.run_detached(effect);
        }
        Ok(())
    }

    /// Applies a command and delivers its map effects before releasing the session,
    /// so listeners see draws and resets in the order the commands were applied.
    /// Returns the effects that still have to run.
    fn apply(&self, command: Command) -> Result<Vec<Effect>, Rejection> {
        let mut session = self.lock();
        let effects = session.apply(command, Utc::now())?;
        self.inner.snapshots.send_replace(session.snapshot());

        let mut pending = Vec::new();
        for effect in effects {
            match effect {
                Effect::DrawRoute { stops } => self.inner.notifier.draw_route(&stops),
                Effect::ResetMap => self.inner.notifier.notify_reset(),
                other => pending.push(other),
            }
        }
        Ok(pending)
    }

    fn run_detached(&self, effect: Effect) {
        match effect {
            Effect::ResolveAddress { epoch, stop_id, coordinates } => {
                let runtime = self.clone();
                tokio::spawn(async move {
                    runtime.resolve_address(epoch, stop_id, coordinates).await;
                });
            }
            Effect::OptimizeRoute(request) => {
                let runtime = self.clone();
                tokio::spawn(async move {
                    runtime.run_optimization(request).await;
                });
            }
            Effect::DrawRoute { stops } => self.inner.notifier.draw_route(&stops),
            Effect::ResetMap => self.inner.notifier.notify_reset(),
            Effect::SaveCompletedRoute(summary) => self.spawn_save(*summary),
        }
    }

    async fn resolve_address(&self, epoch: u64, stop_id: StopId, coordinates: Coordinates) {
        let address = resolve_or_fallback(self.inner.resolver.as_ref(), coordinates, self.inner.geocode_timeout).await;
        // Dropped results are already logged by the session.
        let _ = self.apply(Command::AddressResolved { epoch, stop_id, address });
    }

    async fn run_optimization(&self, request: OptimizationRequest) -> OptimizeOutcome {
        let result = optimize_within(self.inner.optimizer.as_ref(), &request.stops, &request.options, self.inner.optimize_timeout).await;

        let route = match result {
            Ok(route) => route,
            Err(AdapterError::Aborted) => return OptimizeOutcome::Aborted(AbortReason::Superseded),
            Err(err) => {
                tracing::warn!("Route optimization failed, keeping current order: {err}");
                return OptimizeOutcome::Degraded(err);
            }
        };

        let distance_meters = route.distance_meters;
        match self.apply(Command::OptimizationFinished { request, route }) {
            Ok(effects) => {
                for effect in effects {
                    self.run_detached(effect);
                }
                OptimizeOutcome::Applied { distance_meters }
            }
            Err(Rejection::Aborted(reason)) => OptimizeOutcome::Aborted(reason),
            Err(other) => {
                tracing::debug!("Optimization result not applied: {other}");
                OptimizeOutcome::Aborted(AbortReason::RouteChanged)
            }
        }
    }

    fn spawn_save(&self, summary: CompletedRouteSummary) {
        let persistence = self.inner.persistence.clone();
        tokio::spawn(async move {
            match persistence.save_completed_route(&summary).await {
                Ok(()) => tracing::info!("Saved route {}", summary.route_id),
                Err(err) => tracing::error!("Failed to save route {}: {err}", summary.route_id),
            }
        });
    }

    pub fn start_tracing(&self) -> Result<(), Rejection> {
        self.dispatch(Command::StartTracing)
    }

    pub fn enter_preparation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::EnterPreparation)
    }

    pub fn leave_preparation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::LeavePreparation)
    }

    pub fn set_route_type(&self, route_type: RouteType) -> Result<(), Rejection> {
        self.dispatch(Command::SetRouteType(route_type))
    }

    pub fn on_center_changed(&self, coordinates: Coordinates) -> Result<(), Rejection> {
        self.dispatch(Command::CenterChanged(coordinates))
    }

    /// Adds a stop and, when no address was given, waits for the resolver (bounded by
    /// the geocode deadline). Returns the stop as it is after resolution.
    pub async fn add_stop(&self, coordinates: Coordinates, name: Option<String>, address: Option<String>) -> Result<Stop, Rejection> {
        let id = StopId::generate();
        let effects = self.apply(Command::AddStop { id: id.clone(), coordinates, name, address })?;

        for effect in effects {
            match effect {
                Effect::ResolveAddress { epoch, stop_id, coordinates } => {
                    self.resolve_address(epoch, stop_id, coordinates).await;
                }
                other => self.run_detached(other),
            }
        }

        // The stop may be gone already if the session was reset meanwhile.
        self.snapshot()
            .stop(&id)
            .cloned()
            .ok_or(Rejection::Aborted(AbortReason::StopRemoved))
    }

    pub fn remove_last_stop(&self) -> Result<(), Rejection> {
        self.dispatch(Command::RemoveLastStop)
    }

    pub fn remove_stop(&self, id: StopId) -> Result<(), Rejection> {
        self.dispatch(Command::RemoveStop(id))
    }

    pub fn clear_all_stops(&self) -> Result<(), Rejection> {
        self.dispatch(Command::ClearAllStops)
    }

    pub fn reorder_stop(&self, from: usize, to: usize) -> Result<(), Rejection> {
        self.dispatch(Command::ReorderStop { from, to })
    }

    pub fn update_stop_details(&self, id: StopId, details: StopDetails) -> Result<(), Rejection> {
        self.dispatch(Command::UpdateStopDetails { id, details })
    }

    pub fn show_trace_confirmation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::ShowTraceConfirmation)
    }

    pub fn hide_trace_confirmation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::HideTraceConfirmation)
    }

    pub fn confirm_trace(&self) -> Result<(), Rejection> {
        self.dispatch(Command::ConfirmTrace)
    }

    pub fn cancel_trace(&self) -> Result<(), Rejection> {
        self.dispatch(Command::CancelTrace)
    }

    pub fn start_active_navigation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::StartActiveNavigation)
    }

    pub fn stop_active_navigation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::StopActiveNavigation)
    }

    pub fn pause_navigation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::PauseNavigation)
    }

    pub fn resume_navigation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::ResumeNavigation)
    }

    pub fn complete_current_stop(&self) -> Result<(), Rejection> {
        self.dispatch(Command::CompleteCurrentStop)
    }

    pub fn update_navigation_data(&self, patch: NavigationDataPatch) -> Result<(), Rejection> {
        self.dispatch(Command::UpdateNavigationData(patch))
    }

    /// Submits the reorderable stops to the optimizer and waits for the outcome.
    pub async fn optimize_route(&self) -> Result<OptimizeOutcome, Rejection> {
        let request = {
            let mut session = self.lock();
            let request = session.request_optimization()?;
            self.inner.snapshots.send_replace(session.snapshot());
            request
        };
        Ok(self.run_optimization(request).await)
    }

    /// Re-optimizes when the session suggests it. `None` when no suggestion was due.
    pub async fn suggest_optimization(&self) -> Option<OptimizeOutcome> {
        let due = self.lock().should_suggest_optimization(Utc::now());
        if !due {
            return None;
        }
        tracing::info!("Re-optimizing remaining stops");
        self.optimize_route().await.ok()
    }

    pub fn tick(&self) {
        // Only refreshes active time, never rejected.
        let _ = self.dispatch(Command::Tick);
    }

    /// Refreshes the active time every `period` until the returned handle is aborted.
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if runtime.snapshot().is_in_active_navigation() {
                    runtime.tick();
                }
            }
        })
    }

    pub fn give_up_navigation(&self) -> Result<(), Rejection> {
        self.dispatch(Command::GiveUpNavigation)
    }

    pub fn end_route(&self) -> Result<(), Rejection> {
        self.dispatch(Command::EndRoute)
    }

    pub fn save_and_complete_route(&self) -> Result<(), Rejection> {
        self.dispatch(Command::SaveAndCompleteRoute)
    }

    pub fn open_dialog(&self, dialog: Dialog) {
        let _ = self.dispatch(Command::OpenDialog(dialog));
    }

    pub fn close_dialog(&self, dialog: Dialog) {
        let _ = self.dispatch(Command::CloseDialog(dialog));
    }

    pub fn open_details_modal(&self) {
        self.open_dialog(Dialog::Details);
    }

    pub fn close_details_modal(&self) {
        self.close_dialog(Dialog::Details);
    }

    pub fn open_adjustments_modal(&self) {
        self.open_dialog(Dialog::Adjustments);
    }

    pub fn close_adjustments_modal(&self) {
        self.close_dialog(Dialog::Adjustments);
    }

    pub fn open_final_summary_modal(&self) {
        self.open_dialog(Dialog::FinalSummary);
    }

    pub fn close_final_summary_modal(&self) {
        self.close_dialog(Dialog::FinalSummary);
    }

    pub fn open_configuration(&self) {
        self.open_dialog(Dialog::Configuration);
    }

    pub fn close_configuration(&self) {
        self.close_dialog(Dialog::Configuration);
    }
}
