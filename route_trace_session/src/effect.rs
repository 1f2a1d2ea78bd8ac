use route_trace_lib::{coordinates::Coordinates, route_summary::CompletedRouteSummary, stop::{Stop, StopId}};

use crate::adapters::OptimizeOptions;

/// Side effects requested by a command. The session never performs them itself,
/// `SessionRuntime` does.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Look up an address for a stop that was added without one.
    ResolveAddress { epoch: u64, stop_id: StopId, coordinates: Coordinates },
    OptimizeRoute(OptimizationRequest),
    /// Draw the route line through these stops.
    DrawRoute { stops: Vec<Stop> },
    /// The session was torn down, map overlays should go.
    ResetMap,
    SaveCompletedRoute(Box<CompletedRouteSummary>),
}

/// The stops handed to the optimizer, with what is needed to check the answer still applies.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    pub epoch: u64,
    /// Index of the first submitted stop. Non-zero while navigating, completed stops stay put.
    pub offset: usize,
    pub stop_ids: Vec<StopId>,
    pub stops: Vec<Stop>,
    pub options: OptimizeOptions,
}
