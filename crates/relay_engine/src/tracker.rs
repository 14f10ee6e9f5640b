//! Per-request tracker tasks.
//!
//! Each tracker owns one `TrackerState` and turns scan ticks, change
//! notifications and the silence deadline into `relay_core::Msg`s.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_info, engine_warn};
use relay_core::{
    update, CompletionCause, Effect, Msg, PromptJob, RequestId, TrackedSet, TrackerSettings,
    TrackerState,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::emitter::StatusSink;
use crate::observer::VisualTreeObserver;
use crate::page::{NodeChange, NodeHandle};

/// Everything a tracker needs, passed explicitly instead of living in globals.
#[derive(Clone)]
pub struct TrackerContext {
    tracked: Arc<Mutex<TrackedSet>>,
    observer: VisualTreeObserver,
    sink: Arc<dyn StatusSink>,
    settings: TrackerSettings,
}

struct Binding {
    node: NodeHandle,
    changes: mpsc::UnboundedReceiver<NodeChange>,
}

impl TrackerContext {
    pub fn new(
        observer: VisualTreeObserver,
        sink: Arc<dyn StatusSink>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            tracked: Arc::new(Mutex::new(TrackedSet::new())),
            observer,
            sink,
            settings,
        }
    }

    pub fn settings(&self) -> TrackerSettings {
        self.settings
    }

    pub fn is_tracking(&self, id: &RequestId) -> bool {
        self.tracked().contains(id)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked().len()
    }

    /// Called once the page has accepted the text for `id`.
    pub fn on_input_confirmed(
        &self,
        id: RequestId,
        text: impl Into<String>,
    ) -> Option<JoinHandle<CompletionCause>> {
        let mut job = PromptJob::new(id, text);
        job.mark_input_complete();
        self.track(job)
    }

    /// Starts a tracker task unless one already owns the id.
    pub fn track(&self, job: PromptJob) -> Option<JoinHandle<CompletionCause>> {
        if !self.tracked().try_insert(job.id()) {
            engine_warn!("[{}] already tracked; ignoring second tracking request", job.id());
            return None;
        }
        engine_info!("[{}] tracking started", job.id());
        let state = job.start_tracking(now(), self.settings);
        let ctx = self.clone();
        Some(tokio::spawn(async move { ctx.run(state).await }))
    }

    async fn run(self, mut state: TrackerState) -> CompletionCause {
        let id = state.id().clone();
        let mut scan = time::interval(self.settings.scan_interval);
        scan.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut binding: Option<Binding> = None;

        loop {
            let deadline = time::Instant::from_std(state.silence_deadline());
            let msg = tokio::select! {
                _ = scan.tick(), if binding.is_none() => self.scan(&state, &mut binding),
                change = next_change(&mut binding) => self.on_change(&id, change, &mut binding),
                _ = time::sleep_until(deadline) => Msg::Tick { now: now() },
            };

            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                match effect {
                    Effect::Emit(status) => {
                        engine_debug!("[{}] status {}", id, status);
                        self.sink.emit(&id, status);
                    }
                    Effect::Retire { cause } => {
                        self.retire(&id, cause);
                        return cause;
                    }
                }
            }
        }
    }

    fn scan(&self, state: &TrackerState, binding: &mut Option<Binding>) -> Msg {
        let now = now();
        match self.observer.discover(state.id(), state.text()) {
            Some(found) => {
                engine_info!(
                    "[{}] bound to page node ({})",
                    state.id(),
                    if found.via_tag { "tag" } else { "text match" }
                );
                *binding = Some(Binding {
                    node: found.node,
                    changes: found.changes,
                });
                Msg::CandidateFound {
                    now,
                    text: found.text,
                }
            }
            None => Msg::Tick { now },
        }
    }

    fn on_change(
        &self,
        id: &RequestId,
        change: Option<NodeChange>,
        binding: &mut Option<Binding>,
    ) -> Msg {
        let now = now();
        let text = match (change, binding.as_mut()) {
            (Some(NodeChange::Changed), Some(bound)) => {
                if drain_detached(&mut bound.changes) {
                    None
                } else {
                    self.observer.read(bound.node)
                }
            }
            _ => None,
        };
        match text {
            Some(text) => Msg::ContentChanged { now, text },
            None => {
                engine_info!("[{}] bound node left the page", id);
                *binding = None;
                Msg::NodeDetached { now }
            }
        }
    }

    fn retire(&self, id: &RequestId, cause: CompletionCause) {
        self.tracked().remove(id);
        match cause {
            CompletionCause::ExplicitComplete => engine_info!("[{}] completed", id),
            CompletionCause::SilenceTimeout => engine_warn!(
                "[{}] no progress for {:?}; reporting completion",
                id,
                self.settings.silence_timeout
            ),
        }
    }

    fn tracked(&self) -> MutexGuard<'_, TrackedSet> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn next_change(binding: &mut Option<Binding>) -> Option<NodeChange> {
    match binding {
        Some(bound) => bound.changes.recv().await,
        None => std::future::pending().await,
    }
}

/// Coalesces queued notifications; returns `true` if the node detached meanwhile.
fn drain_detached(changes: &mut mpsc::UnboundedReceiver<NodeChange>) -> bool {
    loop {
        match changes.try_recv() {
            Ok(NodeChange::Changed) => continue,
            Ok(NodeChange::Detached) | Err(TryRecvError::Disconnected) => return true,
            Err(TryRecvError::Empty) => return false,
        }
    }
}

fn now() -> std::time::Instant {
    time::Instant::now().into_std()
}
