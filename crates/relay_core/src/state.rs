use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Interval between discovery scans while a request has no bound node.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(1000);
/// Window without a progress signal after which a request is treated as done.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Opaque controller-assigned identifier; never generated by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RequestId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    pub scan_interval: Duration,
    pub silence_timeout: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
        }
    }
}

/// Lifecycle of a dispatched job, from the controller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStage {
    #[default]
    Received,
    InputComplete,
    Tracking,
    Complete,
}

/// A job before its tracker exists.
///
/// Tracking is entered by consuming the job, so a finished tracker can
/// never be turned back into a tracking one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptJob {
    id: RequestId,
    text: String,
    stage: JobStage,
}

impl PromptJob {
    pub fn new(id: RequestId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            stage: JobStage::Received,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn mark_input_complete(&mut self) {
        if self.stage == JobStage::Received {
            self.stage = JobStage::InputComplete;
        }
    }

    pub fn start_tracking(self, now: Instant, settings: TrackerSettings) -> TrackerState {
        TrackerState::new(self.id, self.text, now, settings)
    }
}

/// `Idle` is implicit: a request has no `TrackerState` until tracking starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Watching,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    id: RequestId,
    text: String,
    phase: TrackerPhase,
    started_at: Instant,
    last_signal_at: Instant,
    last_progress: Option<u64>,
    bound: bool,
    settings: TrackerSettings,
}

impl TrackerState {
    pub fn new(
        id: RequestId,
        text: impl Into<String>,
        now: Instant,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            phase: TrackerPhase::Watching,
            started_at: now,
            last_signal_at: now,
            last_progress: None,
            bound: false,
            settings,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn stage(&self) -> JobStage {
        match self.phase {
            TrackerPhase::Watching => JobStage::Tracking,
            TrackerPhase::Complete => JobStage::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == TrackerPhase::Complete
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn last_signal_at(&self) -> Instant {
        self.last_signal_at
    }

    pub fn last_progress(&self) -> Option<u64> {
        self.last_progress
    }

    pub fn settings(&self) -> TrackerSettings {
        self.settings
    }

    /// Instant at which silence alone completes the request.
    pub fn silence_deadline(&self) -> Instant {
        self.last_signal_at + self.settings.silence_timeout
    }

    pub(crate) fn bind(&mut self) {
        self.bound = true;
    }

    pub(crate) fn unbind(&mut self) {
        self.bound = false;
    }

    pub(crate) fn record_signal(&mut self, now: Instant, value: u64) {
        self.last_signal_at = now;
        self.last_progress = Some(value);
    }

    pub(crate) fn complete(&mut self) {
        self.phase = TrackerPhase::Complete;
        self.bound = false;
    }
}
