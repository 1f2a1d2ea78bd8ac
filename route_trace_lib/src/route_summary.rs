use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::{navigation_data::NavigationData, stop::Stop};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteType {
    Temporary,
    Direct,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Temporary => "temporary",
            RouteType::Direct => "direct",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temporary" => Ok(RouteType::Temporary),
            "direct" => Ok(RouteType::Direct),
            other => Err(format!("Unknown route type: {other}")),
        }
    }
}

/// Immutable record of a finished route, handed to persistence once all stops are done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRouteSummary {
    pub route_id: String,
    pub completed_at: DateTime<Utc>,
    pub stops: Vec<Stop>,
    pub navigation_data: NavigationData,
    pub total_stops: usize,
    pub completed_stops: usize,
    pub route_type: Option<RouteType>,
    pub estimated_credits: u32,
}

impl CompletedRouteSummary {
    pub fn new(
        completed_at: DateTime<Utc>,
        stops: Vec<Stop>,
        navigation_data: NavigationData,
        route_type: Option<RouteType>,
        estimated_credits: u32,
    ) -> Self {
        let completed_stops = stops.iter().filter(|stop| stop.is_completed).count();
        Self {
            route_id: format!("route-{}", completed_at.timestamp_millis()),
            completed_at,
            total_stops: stops.len(),
            completed_stops,
            stops,
            navigation_data,
            route_type,
            estimated_credits,
        }
    }

    pub fn to_blob(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for CompletedRouteSummary {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let blob: Vec<u8> = row.try_get("summary")?;
        CompletedRouteSummary::from_blob(&blob).map_err(|err| sqlx::Error::Decode(err.into()))
    }
}
