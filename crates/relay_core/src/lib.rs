//! Relay core: pure tracker state machine, progress parsing and dispatch bookkeeping.
//!
//! Nothing in this crate performs IO or reads a clock. Callers pass `now`
//! explicitly, which keeps every transition reproducible in tests.
mod dispatch;
mod effect;
mod msg;
mod progress;
mod state;
mod status;
mod tracked;
mod update;
mod wildcard;

pub use dispatch::{DispatchLedger, DispatchLimits, Gate, SENT_MARKER};
pub use effect::{CompletionCause, Effect};
pub use msg::Msg;
pub use progress::{extract_progress, ProgressSignal, COMPLETE_PERCENT};
pub use state::{
    JobStage, PromptJob, RequestId, TrackerPhase, TrackerSettings, TrackerState,
    DEFAULT_SCAN_INTERVAL, DEFAULT_SILENCE_TIMEOUT,
};
pub use status::Status;
pub use tracked::TrackedSet;
pub use update::update;
pub use wildcard::Wildcards;
