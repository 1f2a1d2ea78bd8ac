//! Ports to the outside world and the deadline policy around them.
//!
//! Implementations may fail however they like. `resolve_or_fallback` and
//! `optimize_within` turn every failure into a degraded result and bound the
//! wait, so the session never blocks on the network.

use std::time::Duration;

use async_trait::async_trait;
use route_trace_lib::{coordinates::{format_coordinates, Coordinates}, route_summary::CompletedRouteSummary, stop::Stop};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::{error::{AdapterError, PersistenceError}, registry::is_permutation};

pub mod mapbox;

#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, coordinates: Coordinates) -> Result<String, AdapterError>;
}

#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize(&self, stops: &[Stop], options: &OptimizeOptions) -> Result<OptimizedRoute, AdapterError>;
}

#[async_trait]
pub trait PlaceSearcher: Send + Sync {
    async fn search_places(&self, query: &str, kind: SearchKind) -> Result<Vec<Place>, AdapterError>;
}

/// Receives the summary of every completed route. Failures are logged, never retried.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save_completed_route(&self, summary: &CompletedRouteSummary) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    First,
    Last,
    Any,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::First => "first",
            Endpoint::Last => "last",
            Endpoint::Any => "any",
        }
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Endpoint::First),
            "last" => Ok(Endpoint::Last),
            "any" => Ok(Endpoint::Any),
            other => Err(format!("Unknown endpoint: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub roundtrip: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            source: Endpoint::First,
            destination: Endpoint::Last,
            roundtrip: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    /// Input indices in visiting order.
    pub ordered_waypoint_indices: Vec<usize>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
}

impl OptimizedRoute {
    pub fn validate(&self, stop_count: usize) -> Result<(), AdapterError> {
        if is_permutation(&self.ordered_waypoint_indices, stop_count) {
            Ok(())
        } else {
            Err(AdapterError::Malformed(format!(
                "expected a permutation of {} waypoints, got {:?}",
                stop_count, self.ordered_waypoint_indices
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Businesses and points of interest.
    Poi,
    /// Streets, addresses and administrative areas.
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub place_name: String,
    pub text: String,
    pub center: Coordinates,
    pub place_type: Vec<String>,
}

impl Place {
    pub(crate) fn dedup_key(&self) -> String {
        format!("{}-{:.3}-{:.3}", self.text, self.center.x(), self.center.y())
    }
}

/// Resolves an address within `deadline`, falling back to the formatted coordinates on any failure.
pub async fn resolve_or_fallback(resolver: &dyn AddressResolver, coordinates: Coordinates, deadline: Duration) -> String {
    match timeout(deadline, resolver.resolve(coordinates)).await {
        Ok(Ok(address)) if !address.trim().is_empty() => address,
        Ok(Ok(_)) => {
            tracing::debug!("Empty address for {:?}, using coordinates", coordinates);
            format_coordinates(&coordinates)
        }
        Ok(Err(AdapterError::Aborted)) => {
            tracing::debug!("Address lookup aborted, using coordinates");
            format_coordinates(&coordinates)
        }
        Ok(Err(err)) => {
            tracing::warn!("Address lookup failed, using coordinates: {err}");
            format_coordinates(&coordinates)
        }
        Err(_) => {
            tracing::warn!("Address lookup timed out after {:?}, using coordinates", deadline);
            format_coordinates(&coordinates)
        }
    }
}

/// Runs the optimizer within `deadline` and rejects results that are not a permutation of the input.
pub async fn optimize_within(optimizer: &dyn RouteOptimizer, stops: &[Stop], options: &OptimizeOptions, deadline: Duration) -> Result<OptimizedRoute, AdapterError> {
    let route = timeout(deadline, optimizer.optimize(stops, options))
        .await
        .map_err(|_| AdapterError::Timeout(deadline))??;
    route.validate(stops.len())?;
    Ok(route)
}

#[cfg(test)]
mod tests {
    use route_trace_lib::{coordinates::coordinates, stop::StopId};

    use super::*;

    struct SlowResolver;

    #[async_trait]
    impl AddressResolver for SlowResolver {
        async fn resolve(&self, _coordinates: Coordinates) -> Result<String, AdapterError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    struct FixedResolver(Result<String, AdapterError>);

    #[async_trait]
    impl AddressResolver for FixedResolver {
        async fn resolve(&self, _coordinates: Coordinates) -> Result<String, AdapterError> {
            self.0.clone()
        }
    }

    struct FixedOptimizer(Vec<usize>);

    #[async_trait]
    impl RouteOptimizer for FixedOptimizer {
        async fn optimize(&self, _stops: &[Stop], _options: &OptimizeOptions) -> Result<OptimizedRoute, AdapterError> {
            Ok(OptimizedRoute { ordered_waypoint_indices: self.0.clone(), distance_meters: None, duration_seconds: None })
        }
    }

    fn stops(count: usize) -> Vec<Stop> {
        (0..count).map(|i| Stop::new(StopId::new(format!("s{i}")), format!("Stop {i}"), coordinates(i as f64, 0.), None, i as u32 + 1)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn resolver_deadline_falls_back() {
        let point = coordinates(-46.6333, -23.5505);
        let address = resolve_or_fallback(&SlowResolver, point, Duration::from_secs(8)).await;
        assert_eq!(address, "Lat: -23.5505, Lng: -46.6333");
    }

    #[tokio::test]
    async fn resolver_failure_falls_back() {
        let point = coordinates(1.0, 2.0);
        let failing = FixedResolver(Err(AdapterError::Transport("connection reset".into())));
        assert_eq!(resolve_or_fallback(&failing, point, Duration::from_secs(1)).await, "Lat: 2.0000, Lng: 1.0000");

        let blank = FixedResolver(Ok("  ".into()));
        assert_eq!(resolve_or_fallback(&blank, point, Duration::from_secs(1)).await, "Lat: 2.0000, Lng: 1.0000");

        let ok = FixedResolver(Ok("Av. Paulista, 1000".into()));
        assert_eq!(resolve_or_fallback(&ok, point, Duration::from_secs(1)).await, "Av. Paulista, 1000");
    }

    #[tokio::test]
    async fn optimizer_result_must_be_permutation() {
        let stops = stops(3);
        let options = OptimizeOptions::default();
        let partial = optimize_within(&FixedOptimizer(vec![1, 0]), &stops, &options, Duration::from_secs(1)).await;
        assert!(matches!(partial, Err(AdapterError::Malformed(_))));

        let good = optimize_within(&FixedOptimizer(vec![2, 0, 1]), &stops, &options, Duration::from_secs(1)).await.unwrap();
        assert_eq!(good.ordered_waypoint_indices, vec![2, 0, 1]);
    }
}
