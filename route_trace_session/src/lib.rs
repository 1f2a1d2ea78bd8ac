pub mod adapters;
pub mod config;
pub mod effect;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod phase;
pub mod registry;
pub mod runtime;
pub mod search;
pub mod session;
pub mod snapshot;

pub use config::SessionConfig;
pub use error::{AbortReason, AdapterError, Rejection, ValidationError};
pub use phase::{Dialog, SessionPhase};
pub use runtime::{OptimizeOutcome, SessionRuntime};
pub use session::{Command, TraceSession};
pub use snapshot::SessionSnapshot;
