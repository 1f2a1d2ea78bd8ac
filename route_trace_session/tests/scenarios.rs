use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use route_trace_lib::{
    coordinates::{coordinates, Coordinates},
    route_summary::CompletedRouteSummary,
    stop::{Stop, StopId},
};
use route_trace_session::{
    adapters::{AddressResolver, OptimizeOptions, OptimizedRoute, PersistenceSink, RouteOptimizer},
    error::PersistenceError,
    notifier::MapCollaborator,
    AbortReason, AdapterError, Command, OptimizeOutcome, Rejection, SessionConfig, SessionPhase, SessionRuntime,
    ValidationError,
};
use tokio::sync::mpsc;

struct FakeResolver {
    delay: Duration,
}

#[async_trait]
impl AddressResolver for FakeResolver {
    async fn resolve(&self, coordinates: Coordinates) -> Result<String, AdapterError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("Rua {:.2}", coordinates.y()))
    }
}

enum OptimizerBehavior {
    Reverse,
    Hang,
    Fail,
}

struct FakeOptimizer {
    behavior: OptimizerBehavior,
}

#[async_trait]
impl RouteOptimizer for FakeOptimizer {
    async fn optimize(&self, stops: &[Stop], _options: &OptimizeOptions) -> Result<OptimizedRoute, AdapterError> {
        match self.behavior {
            OptimizerBehavior::Reverse => Ok(OptimizedRoute {
                ordered_waypoint_indices: (0..stops.len()).rev().collect(),
                distance_meters: Some(4_000.0),
                duration_seconds: Some(600.0),
            }),
            OptimizerBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AdapterError::Transport("never".into()))
            }
            OptimizerBehavior::Fail => Err(AdapterError::Transport("connection refused".into())),
        }
    }
}

struct RecordingSink {
    saved: mpsc::UnboundedSender<CompletedRouteSummary>,
    fail: bool,
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn save_completed_route(&self, summary: &CompletedRouteSummary) -> Result<(), PersistenceError> {
        let _ = self.saved.send(summary.clone());
        if self.fail {
            Err(PersistenceError("disk full".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct CountingMap {
    resets: AtomicUsize,
    drawn: Mutex<Vec<usize>>,
}

impl MapCollaborator for CountingMap {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn draw_route(&self, stops: &[Stop]) {
        self.drawn.lock().unwrap().push(stops.len());
    }
}

/// Records map calls in the order they arrive.
#[derive(Default)]
struct EventMap {
    events: Mutex<Vec<&'static str>>,
}

impl MapCollaborator for EventMap {
    fn reset(&self) {
        self.events.lock().unwrap().push("reset");
    }

    fn draw_route(&self, _stops: &[Stop]) {
        self.events.lock().unwrap().push("draw");
    }
}

struct Harness {
    runtime: SessionRuntime,
    map: Arc<CountingMap>,
    saved: mpsc::UnboundedReceiver<CompletedRouteSummary>,
}

fn harness(resolver_delay: Duration, behavior: OptimizerBehavior, fail_save: bool) -> Harness {
    let (tx, saved) = mpsc::unbounded_channel();
    let runtime = SessionRuntime::new(
        &SessionConfig::default(),
        Arc::new(FakeResolver { delay: resolver_delay }),
        Arc::new(FakeOptimizer { behavior }),
        Arc::new(RecordingSink { saved: tx, fail: fail_save }),
    );
    let map = Arc::new(CountingMap::default());
    runtime.register_map(map.clone());
    Harness { runtime, map, saved }
}

fn default_harness() -> Harness {
    harness(Duration::from_millis(10), OptimizerBehavior::Reverse, false)
}

async fn traced_with(runtime: &SessionRuntime, points: &[(f64, f64)]) -> Vec<Stop> {
    runtime.start_tracing().unwrap();
    let mut stops = Vec::new();
    for &(lng, lat) in points {
        stops.push(runtime.add_stop(coordinates(lng, lat), None, None).await.unwrap());
    }
    runtime.show_trace_confirmation().unwrap();
    runtime.confirm_trace().unwrap();
    stops
}

#[tokio::test(start_paused = true)]
async fn trace_two_stops_and_confirm() {
    let Harness { runtime, map, .. } = default_harness();
    runtime.start_tracing().unwrap();

    let first = runtime.add_stop(coordinates(-46.63, -23.55), None, None).await.unwrap();
    runtime.add_stop(coordinates(-46.64, -23.56), Some("Cliente".into()), None).await.unwrap();
    assert_eq!(first.address.as_deref(), Some("Rua -23.55"));
    assert_eq!(first.name, "Stop 1");

    runtime.show_trace_confirmation().unwrap();
    runtime.confirm_trace().unwrap();

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Traced);
    assert_eq!(snapshot.stops.len(), 2);
    assert_eq!(snapshot.stops[1].name, "Cliente");
    assert!(!snapshot.show_confirm_dialog());
    assert_eq!(snapshot.estimated_credits, 9);
    assert_eq!(*map.drawn.lock().unwrap(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn navigate_three_stops_to_completion() {
    let Harness { runtime, .. } = default_harness();
    traced_with(&runtime, &[(-46.63, -23.55), (-46.64, -23.56), (-46.65, -23.57)]).await;

    runtime.start_active_navigation().unwrap();
    for _ in 0..3 {
        runtime.complete_current_stop().unwrap();
    }

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::AllStopsCompleted);
    assert_eq!(snapshot.navigation_data.remaining_distance_meters, 0.0);
    assert!(snapshot.stops.iter().all(|stop| stop.is_completed));
    assert_eq!(snapshot.progress_percent(), 100.0);

    // Double tap after the last stop changes nothing.
    assert!(matches!(runtime.complete_current_stop(), Err(Rejection::InvalidPhase { .. })));
    assert_eq!(runtime.snapshot(), snapshot);
}

#[tokio::test(start_paused = true)]
async fn optimizer_timeout_keeps_order() {
    let Harness { runtime, .. } = harness(Duration::from_millis(10), OptimizerBehavior::Hang, false);
    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02)]).await;
    let before = runtime.snapshot();

    let outcome = runtime.optimize_route().await.unwrap();
    assert_eq!(outcome, OptimizeOutcome::Degraded(AdapterError::Timeout(Duration::from_secs(15))));
    assert_eq!(runtime.snapshot().stops, before.stops);
    assert_eq!(runtime.snapshot().navigation_data.optimization_count, 0);
}

#[tokio::test(start_paused = true)]
async fn optimizer_failure_keeps_order() {
    let Harness { runtime, .. } = harness(Duration::from_millis(10), OptimizerBehavior::Fail, false);
    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01)]).await;
    let before = runtime.snapshot();

    let outcome = runtime.optimize_route().await.unwrap();
    assert!(matches!(outcome, OptimizeOutcome::Degraded(AdapterError::Transport(_))));
    assert_eq!(runtime.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn optimization_reorders_and_redraws() {
    let Harness { runtime, map, .. } = default_harness();
    let stops = traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02)]).await;

    let outcome = runtime.optimize_route().await.unwrap();
    assert_eq!(outcome, OptimizeOutcome::Applied { distance_meters: Some(4_000.0) });

    let snapshot = runtime.snapshot();
    let ids: Vec<&StopId> = snapshot.stops.iter().map(|stop| &stop.id).collect();
    assert_eq!(ids, vec![&stops[2].id, &stops[1].id, &stops[0].id]);
    assert_eq!(snapshot.stops.iter().map(|stop| stop.order).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(snapshot.navigation_data.total_distance_meters, 4_000.0);
    assert_eq!(*map.drawn.lock().unwrap(), vec![3, 3]);
}

#[tokio::test(start_paused = true)]
async fn optimizing_one_stop_is_a_validation_error() {
    let Harness { runtime, .. } = default_harness();
    traced_with(&runtime, &[(0.0, 0.0)]).await;
    let rejection = runtime.optimize_route().await.unwrap_err();
    assert_eq!(rejection, Rejection::Validation(ValidationError::NotEnoughStopsToOptimize { available: 1 }));
    assert!(rejection.user_message().is_some());
}

#[tokio::test(start_paused = true)]
async fn remove_middle_stop_renumbers() {
    let Harness { runtime, .. } = default_harness();
    runtime.start_tracing().unwrap();
    let a = runtime.add_stop(coordinates(0.0, 0.0), None, Some("A".into())).await.unwrap();
    let b = runtime.add_stop(coordinates(0.0, 0.1), None, Some("B".into())).await.unwrap();
    let c = runtime.add_stop(coordinates(0.0, 0.2), None, Some("C".into())).await.unwrap();

    runtime.remove_stop(b.id).unwrap();

    let stops = runtime.snapshot().stops;
    assert_eq!(stops.iter().map(|stop| (&stop.id, stop.order)).collect::<Vec<_>>(), vec![(&a.id, 1), (&c.id, 2)]);
}

#[tokio::test(start_paused = true)]
async fn slow_resolver_falls_back_to_coordinates() {
    let Harness { runtime, .. } = harness(Duration::from_secs(60), OptimizerBehavior::Reverse, false);
    runtime.start_tracing().unwrap();

    let stop = runtime.add_stop(coordinates(-46.6333, -23.5505), None, None).await.unwrap();
    assert_eq!(stop.address.as_deref(), Some("Lat: -23.5505, Lng: -46.6333"));
}

#[tokio::test(start_paused = true)]
async fn reset_drops_in_flight_resolution() {
    let Harness { runtime, map, .. } = harness(Duration::from_secs(2), OptimizerBehavior::Reverse, false);
    runtime.start_tracing().unwrap();
    runtime.dispatch(Command::AddStop {
        id: StopId::new("early"),
        coordinates: coordinates(0.0, 0.0),
        name: None,
        address: None,
    }).unwrap();

    runtime.cancel_trace().unwrap();
    runtime.start_tracing().unwrap();
    runtime.dispatch(Command::AddStop {
        id: StopId::new("early"),
        coordinates: coordinates(1.0, 1.0),
        name: None,
        address: Some("Fixed".into()),
    }).unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.epoch, 1);
    assert_eq!(snapshot.stops.len(), 1);
    assert_eq!(snapshot.stops[0].address.as_deref(), Some("Fixed"));
    assert_eq!(map.resets.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn add_stop_aborted_by_reset() {
    let Harness { runtime, .. } = harness(Duration::from_secs(2), OptimizerBehavior::Reverse, false);
    runtime.start_tracing().unwrap();

    let pending = tokio::spawn({
        let runtime = runtime.clone();
        async move { runtime.add_stop(coordinates(0.0, 0.0), None, None).await }
    });
    tokio::task::yield_now().await;
    runtime.cancel_trace().unwrap();

    assert_eq!(pending.await.unwrap(), Err(Rejection::Aborted(AbortReason::StopRemoved)));
}

#[tokio::test(start_paused = true)]
async fn completed_route_is_persisted_and_session_resets() {
    let Harness { runtime, map, mut saved } = default_harness();
    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01)]).await;
    runtime.start_active_navigation().unwrap();
    runtime.complete_current_stop().unwrap();
    runtime.complete_current_stop().unwrap();
    assert!(runtime.snapshot().show_final_summary_modal());

    runtime.save_and_complete_route().unwrap();

    let summary = saved.recv().await.unwrap();
    assert_eq!(summary.total_stops, 2);
    assert_eq!(summary.completed_stops, 2);
    assert_eq!(summary.estimated_credits, 9);

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(snapshot.stops.is_empty());
    assert!(!snapshot.show_final_summary_modal());
    assert_eq!(map.resets.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_does_not_block_reset() {
    let Harness { runtime, mut saved, .. } = harness(Duration::from_millis(10), OptimizerBehavior::Reverse, true);
    traced_with(&runtime, &[(0.0, 0.0)]).await;
    runtime.start_active_navigation().unwrap();
    runtime.complete_current_stop().unwrap();
    runtime.save_and_complete_route().unwrap();

    assert!(saved.recv().await.is_some());
    assert_eq!(runtime.snapshot().phase, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn give_up_resets_map_once() {
    let Harness { runtime, map, .. } = default_harness();
    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01)]).await;
    runtime.start_active_navigation().unwrap();

    runtime.give_up_navigation().unwrap();
    assert!(runtime.give_up_navigation().is_err());
    assert!(runtime.end_route().is_err());

    assert_eq!(map.resets.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.snapshot().phase, SessionPhase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimization_racing_give_up_never_draws_after_reset() {
    for _ in 0..50 {
        let Harness { runtime, .. } = harness(Duration::ZERO, OptimizerBehavior::Reverse, false);
        let events = Arc::new(EventMap::default());
        runtime.register_map(events.clone());
        traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02)]).await;

        let optimizing = tokio::spawn({
            let runtime = runtime.clone();
            async move { runtime.optimize_route().await }
        });
        let giving_up = tokio::spawn({
            let runtime = runtime.clone();
            async move { runtime.give_up_navigation() }
        });

        // Either outcome is fine as long as the map ends up cleared.
        let _ = optimizing.await.unwrap();
        giving_up.await.unwrap().unwrap();

        let events = events.events.lock().unwrap();
        assert_eq!(events.last(), Some(&"reset"), "map events: {events:?}");
        assert_eq!(events.iter().filter(|event| **event == "reset").count(), 1);
        assert_eq!(runtime.snapshot().phase, SessionPhase::Idle);
    }
}

#[tokio::test(start_paused = true)]
async fn optimize_route_reports_rejections_without_outcome() {
    let Harness { runtime, .. } = default_harness();
    assert!(matches!(runtime.optimize_route().await, Err(Rejection::InvalidPhase { .. })));

    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01)]).await;
    runtime.start_active_navigation().unwrap();
    runtime.complete_current_stop().unwrap();
    assert_eq!(
        runtime.optimize_route().await,
        Err(Rejection::Validation(ValidationError::NotEnoughStopsToOptimize { available: 1 }))
    );
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_every_accepted_command() {
    let Harness { runtime, .. } = default_harness();
    let mut snapshots = runtime.subscribe();

    runtime.start_tracing().unwrap();
    snapshots.changed().await.unwrap();
    assert!(snapshots.borrow_and_update().is_tracing());

    assert!(runtime.confirm_trace().is_err());
    assert!(!snapshots.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn suggestion_triggers_reoptimization() {
    let Harness { runtime, .. } = default_harness();
    traced_with(&runtime, &[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02), (0.0, 0.03), (0.0, 0.04)]).await;
    runtime.start_active_navigation().unwrap();
    assert_eq!(runtime.suggest_optimization().await, None);

    runtime.complete_current_stop().unwrap();
    let outcome = runtime.suggest_optimization().await;
    assert!(matches!(outcome, Some(OptimizeOutcome::Applied { .. })));

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.navigation_data.optimization_count, 1);
    assert!(snapshot.stops[0].is_completed);
    assert_eq!(snapshot.stops[1].coordinates, coordinates(0.0, 0.04));
    // Right after an optimization nothing is suggested.
    assert_eq!(runtime.suggest_optimization().await, None);
}

#[tokio::test(start_paused = true)]
async fn dialogs_toggle_independently() {
    let Harness { runtime, .. } = default_harness();
    runtime.open_details_modal();
    runtime.open_adjustments_modal();
    runtime.close_details_modal();
    runtime.close_details_modal();
    runtime.open_configuration();

    let snapshot = runtime.snapshot();
    assert!(!snapshot.show_details_modal());
    assert!(snapshot.show_adjustments_modal());
    assert!(snapshot.show_config_modal());
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}
