use chrono::{DateTime, Utc};
use route_trace_lib::{coordinates::Coordinates, stop::{Stop, StopId}};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const BASE_CREDITS: u32 = 5;
pub const CREDITS_PER_STOP: u32 = 2;
pub const MAX_CREDITS: u32 = 20;

/// Credits charged for a route with `stop_count` stops, always within `BASE_CREDITS..=MAX_CREDITS`.
pub fn estimate_credits(stop_count: usize) -> u32 {
    let count = u32::try_from(stop_count).unwrap_or(u32::MAX);
    BASE_CREDITS.saturating_add(CREDITS_PER_STOP.saturating_mul(count)).min(MAX_CREDITS)
}

/// True when `indices` is a permutation of `0..len`.
pub fn is_permutation(indices: &[usize], len: usize) -> bool {
    if indices.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in indices {
        if index >= len || seen[index] {
            return false;
        }
        seen[index] = true;
    }
    true
}

/// User editable fields of a stop. `None` leaves the field as it is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StopDetails {
    pub name: Option<String>,
    pub code: Option<String>,
    pub notes: Option<String>,
}

/// Ordered stops of the route. Every mutation renumbers `order` to `1..=len`
/// and recomputes the credit estimate before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRegistry {
    stops: Vec<Stop>,
    estimated_credits: u32,
}

impl Default for StopRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StopRegistry {
    pub fn new() -> Self {
        Self {
            stops: Vec::new(),
            estimated_credits: estimate_credits(0),
        }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn estimated_credits(&self) -> u32 {
        self.estimated_credits
    }

    pub fn get(&self, id: &StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    pub fn position(&self, id: &StopId) -> Option<usize> {
        self.stops.iter().position(|stop| &stop.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.stops.iter().filter(|stop| stop.is_completed).count()
    }

    pub fn push(&mut self, id: StopId, coordinates: Coordinates, name: Option<String>, address: Option<String>) -> Result<&Stop, ValidationError> {
        if self.get(&id).is_some() {
            return Err(ValidationError::DuplicateStop(id));
        }

        let order = self.stops.len() as u32 + 1;
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Stop {order}"));

        self.stops.push(Stop::new(id, name, coordinates, address, order));
        self.renumber();

        // Safe, just pushed
        Ok(&self.stops[self.stops.len() - 1])
    }

    pub fn remove_last(&mut self) -> Option<Stop> {
        let removed = self.stops.pop();
        self.renumber();
        removed
    }

    pub fn remove_by_id(&mut self, id: &StopId) -> Option<Stop> {
        let index = self.position(id)?;
        let removed = self.stops.remove(index);
        self.renumber();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.stops.clear();
        self.renumber();
    }

    /// Moves the stop at `from` so it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.stops.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::StopIndexOutOfBounds { index, len });
            }
        }

        let stop = self.stops.remove(from);
        self.stops.insert(to, stop);
        self.renumber();
        Ok(())
    }

    /// Reorders `stops[offset..]` so that position `k` holds the stop previously at `offset + ordered[k]`.
    /// Nothing changes unless `ordered` is a permutation of the whole segment.
    pub fn apply_permutation(&mut self, offset: usize, ordered: &[usize]) -> bool {
        if offset > self.stops.len() || !is_permutation(ordered, self.stops.len() - offset) {
            return false;
        }

        let segment: Vec<Stop> = self.stops.drain(offset..).collect();
        self.stops.extend(ordered.iter().map(|&index| segment[index].clone()));
        self.renumber();
        true
    }

    /// No-op returning false when the stop is unknown or already completed.
    pub fn mark_completed(&mut self, id: &StopId, at: DateTime<Utc>) -> bool {
        match self.stops.iter_mut().find(|stop| &stop.id == id) {
            Some(stop) if !stop.is_completed => {
                stop.is_completed = true;
                stop.completed_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub fn set_address(&mut self, id: &StopId, address: String) -> bool {
        match self.stops.iter_mut().find(|stop| &stop.id == id) {
            Some(stop) => {
                stop.address = Some(address);
                true
            }
            None => false,
        }
    }

    pub fn update_details(&mut self, id: &StopId, details: StopDetails) -> Result<(), ValidationError> {
        let stop = self.stops.iter_mut()
            .find(|stop| &stop.id == id)
            .ok_or_else(|| ValidationError::UnknownStop(id.clone()))?;

        if let Some(name) = details.name.filter(|name| !name.trim().is_empty()) {
            stop.name = name;
        }
        if let Some(code) = details.code {
            stop.code = code;
        }
        if let Some(notes) = details.notes {
            stop.notes = notes;
        }
        Ok(())
    }

    pub fn ids(&self, from: usize) -> Vec<StopId> {
        self.stops.iter().skip(from).map(|stop| stop.id.clone()).collect()
    }

    fn renumber(&mut self) {
        for (index, stop) in self.stops.iter_mut().enumerate() {
            stop.order = index as u32 + 1;
        }
        self.estimated_credits = estimate_credits(self.stops.len());
    }
}
