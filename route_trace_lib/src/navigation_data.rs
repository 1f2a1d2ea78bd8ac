use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationData {
    pub start_time: Option<DateTime<Utc>>,
    pub total_distance_meters: f64,
    pub remaining_distance_meters: f64,
    pub estimated_fuel_liters: f64,
    pub actual_fuel_liters: f64,
    pub active_time_millis: u64,
    /// Index of the next stop to complete. Equal to the stop count once everything is done.
    pub current_stop_index: usize,
    pub last_optimization_time: Option<DateTime<Utc>>,
    pub optimization_count: u32,
    pub average_stop_time_millis: f64,
}

/// Partial overwrite of the distance and fuel figures, e.g. with real metrics from the map provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationDataPatch {
    pub total_distance_meters: Option<f64>,
    pub remaining_distance_meters: Option<f64>,
    pub actual_fuel_liters: Option<f64>,
}

impl NavigationDataPatch {
    pub fn has_negative(&self) -> bool {
        [self.total_distance_meters, self.remaining_distance_meters, self.actual_fuel_liters]
            .iter()
            .flatten()
            .any(|value| *value < 0.0 || value.is_nan())
    }
}

#[test]
fn test_patch_negative() {
    let patch = NavigationDataPatch { actual_fuel_liters: Some(-1.0), ..Default::default() };
    assert!(patch.has_negative());
    assert!(!NavigationDataPatch::default().has_negative());
}
