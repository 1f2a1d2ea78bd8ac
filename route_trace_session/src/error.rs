use std::{fmt, time::Duration};

use route_trace_lib::stop::StopId;

use crate::phase::SessionPhase;

/// Why a command left the session untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The command is not meaningful in the current phase. Callers may issue commands optimistically.
    InvalidPhase { command: &'static str, phase: SessionPhase },
    /// Preconditions unmet. The only kind that is shown to the user.
    Validation(ValidationError),
    /// An asynchronous result arrived for state that no longer exists.
    Aborted(AbortReason),
}

impl Rejection {
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Rejection::Validation(err) => Some(err.user_message()),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidPhase { command, phase } => write!(f, "{command} is not available while {phase}"),
            Rejection::Validation(err) => write!(f, "{err}"),
            Rejection::Aborted(reason) => write!(f, "operation aborted: {reason}"),
        }
    }
}

impl From<ValidationError> for Rejection {
    fn from(err: ValidationError) -> Self {
        Rejection::Validation(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NoStops,
    StopIndexOutOfBounds { index: usize, len: usize },
    UnknownStop(StopId),
    DuplicateStop(StopId),
    NotEnoughStopsToOptimize { available: usize },
    RouteInProgress,
    NegativeQuantity,
}

impl ValidationError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            ValidationError::NoStops => "no_stops",
            ValidationError::StopIndexOutOfBounds { .. } => "stop_index_out_of_bounds",
            ValidationError::UnknownStop(_) => "unknown_stop",
            ValidationError::DuplicateStop(_) => "duplicate_stop",
            ValidationError::NotEnoughStopsToOptimize { .. } => "not_enough_stops_to_optimize",
            ValidationError::RouteInProgress => "route_in_progress",
            ValidationError::NegativeQuantity => "negative_quantity",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::NoStops => "Add at least one stop to the route",
            ValidationError::StopIndexOutOfBounds { .. } => "That stop does not exist",
            ValidationError::UnknownStop(_) => "That stop does not exist",
            ValidationError::DuplicateStop(_) => "That stop is already on the route",
            ValidationError::NotEnoughStopsToOptimize { .. } => "At least two stops are needed to optimize",
            ValidationError::RouteInProgress => "The route already has completed stops",
            ValidationError::NegativeQuantity => "Distances and fuel cannot be negative",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::StopIndexOutOfBounds { index, len } => write!(f, "stop index {index} out of bounds for {len} stops"),
            ValidationError::UnknownStop(id) => write!(f, "unknown stop {id}"),
            ValidationError::DuplicateStop(id) => write!(f, "stop {id} already exists"),
            ValidationError::NotEnoughStopsToOptimize { available } => write!(f, "{available} stop(s) available, at least 2 needed to optimize"),
            other => f.write_str(other.reason_code()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    SessionReset,
    StopRemoved,
    RouteChanged,
    Superseded,
    MalformedResult,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbortReason::SessionReset => "session was reset",
            AbortReason::StopRemoved => "stop was removed",
            AbortReason::RouteChanged => "route changed while the request was in flight",
            AbortReason::Superseded => "superseded by a newer request",
            AbortReason::MalformedResult => "result did not match the submitted stops",
        })
    }
}

/// Failures of the external lookups. Never surfaced to the user, they only degrade results.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    Timeout(Duration),
    /// No access token configured.
    Unavailable,
    Transport(String),
    Malformed(String),
    Aborted,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Timeout(deadline) => write!(f, "timed out after {} ms", deadline.as_millis()),
            AdapterError::Unavailable => f.write_str("service not configured"),
            AdapterError::Transport(msg) => write!(f, "transport failure: {msg}"),
            AdapterError::Malformed(msg) => write!(f, "malformed response: {msg}"),
            AdapterError::Aborted => f.write_str("aborted"),
        }
    }
}

impl std::error::Error for AdapterError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceError(pub String);

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to persist route: {}", self.0)
    }
}

impl std::error::Error for PersistenceError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    MalformedLine { line: usize, content: String },
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "failed to read config: {msg}"),
            ConfigError::MalformedLine { line, content } => write!(f, "line {line} is not key = value: {content:?}"),
            ConfigError::InvalidValue { key, value } => write!(f, "invalid value {value:?} for {key}"),
        }
    }
}

impl std::error::Error for ConfigError {}
