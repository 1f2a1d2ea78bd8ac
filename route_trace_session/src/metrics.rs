//! Distance, fuel and time estimates for a route.
//!
//! These are deliberately coarse. Legs are measured as planar degree distances
//! scaled by a constant instead of along the road network.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use route_trace_lib::{coordinates::Coordinates, stop::Stop};
use serde::{Deserialize, Serialize};

pub const METERS_PER_DEGREE: f64 = 111_000.0;
/// Fuel consumption of the estimate, one liter per 10 km.
pub const METERS_PER_LITER: f64 = 10_000.0;

pub fn leg_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let dx = to.x() - from.x();
    let dy = to.y() - from.y();
    (dx * dx + dy * dy).sqrt() * METERS_PER_DEGREE
}

pub fn estimate_total_distance(stops: &[Stop]) -> f64 {
    stops.windows(2)
        .map(|pair| leg_distance(&pair[0].coordinates, &pair[1].coordinates))
        .sum()
}

pub fn estimate_fuel(distance_meters: f64) -> f64 {
    (distance_meters / METERS_PER_LITER).max(0.0)
}

/// Uniform share of the total for the stops not yet completed.
pub fn recompute_remaining(total_distance: f64, completed_count: usize, total_count: usize) -> f64 {
    if total_count == 0 {
        return 0.0;
    }
    let remaining = total_count.saturating_sub(completed_count) as f64;
    (total_distance * remaining / total_count as f64).max(0.0)
}

/// Sum of the legs still ahead, starting at the last completed stop.
pub fn remaining_along_legs(stops: &[Stop], current_stop_index: usize) -> f64 {
    if current_stop_index >= stops.len() {
        return 0.0;
    }
    estimate_total_distance(&stops[current_stop_index.saturating_sub(1)..])
}

pub fn progress_percent(completed_count: usize, total_count: usize) -> f64 {
    if total_count == 0 {
        return 0.0;
    }
    completed_count.min(total_count) as f64 * 100.0 / total_count as f64
}

pub fn elapsed_millis(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - since).num_milliseconds()).unwrap_or(0)
}

pub fn average_stop_time(start: DateTime<Utc>, now: DateTime<Utc>, completed_count: usize) -> Option<f64> {
    if completed_count == 0 {
        return None;
    }
    Some(elapsed_millis(start, now) as f64 / completed_count as f64)
}

/// How the remaining distance is derived while navigating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemainingDistanceModel {
    /// `total * (stops left / stops)`.
    #[default]
    Uniform,
    /// Legs from the last completed stop to the end of the route.
    Legs,
}

impl RemainingDistanceModel {
    pub fn remaining(&self, total_distance: f64, stops: &[Stop], current_stop_index: usize) -> f64 {
        match self {
            RemainingDistanceModel::Uniform => {
                let completed = stops.iter().filter(|stop| stop.is_completed).count();
                recompute_remaining(total_distance, completed, stops.len())
            }
            RemainingDistanceModel::Legs => remaining_along_legs(stops, current_stop_index),
        }
    }
}

impl FromStr for RemainingDistanceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(RemainingDistanceModel::Uniform),
            "legs" => Ok(RemainingDistanceModel::Legs),
            other => Err(format!("Unknown remaining distance model: {other}")),
        }
    }
}

impl fmt::Display for RemainingDistanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemainingDistanceModel::Uniform => "uniform",
            RemainingDistanceModel::Legs => "legs",
        })
    }
}
