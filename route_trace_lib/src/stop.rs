use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinates::Coordinates;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Time prefixed random id. Two stops added in the same millisecond still differ.
    pub fn generate() -> Self {
        let suffix: u32 = rand::random();
        Self(format!("stop-{}-{:08x}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub code: String,
    pub notes: String,
    pub coordinates: Coordinates,
    /// None while the address lookup is still in flight.
    pub address: Option<String>,
    /// 1-based position in the route.
    pub order: u32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Stop {
    pub fn new(id: StopId, name: String, coordinates: Coordinates, address: Option<String>, order: u32) -> Self {
        Self {
            id,
            name,
            code: String::new(),
            notes: String::new(),
            coordinates,
            address,
            order,
            is_completed: false,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::coordinates;

    #[test]
    fn generated_ids_differ() {
        let a = StopId::generate();
        let b = StopId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("stop-"));
    }

    #[test]
    fn new_stop_is_pending() {
        let stop = Stop::new("a".into(), "Stop 1".into(), coordinates(1., 2.), None, 1);
        assert!(!stop.is_completed);
        assert!(stop.completed_at.is_none());
        assert!(stop.code.is_empty() && stop.notes.is_empty());
    }
}
