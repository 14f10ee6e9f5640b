use std::time::Instant;

use crate::{extract_progress, CompletionCause, Effect, Msg, Status, TrackerState};

/// Pure update function: applies an observation to one tracker and returns any effects.
///
/// A completed tracker ignores every message, so the terminal status is
/// produced at most once.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    if state.is_complete() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::CandidateFound { now, text } => {
            state.bind();
            observe(&mut state, now, &text)
        }
        Msg::ContentChanged { now, text } => observe(&mut state, now, &text),
        Msg::NodeDetached { now } => {
            state.unbind();
            check_silence(&mut state, now)
        }
        Msg::Tick { now } => check_silence(&mut state, now),
    };

    (state, effects)
}

fn observe(state: &mut TrackerState, now: Instant, text: &str) -> Vec<Effect> {
    match extract_progress(text) {
        Some(signal) if signal.is_complete() => {
            finish(state, CompletionCause::ExplicitComplete)
        }
        Some(signal) => {
            state.record_signal(now, signal.value);
            vec![Effect::Emit(Status::Progress(signal.raw))]
        }
        None => check_silence(state, now),
    }
}

fn check_silence(state: &mut TrackerState, now: Instant) -> Vec<Effect> {
    if now >= state.silence_deadline() {
        finish(state, CompletionCause::SilenceTimeout)
    } else {
        Vec::new()
    }
}

fn finish(state: &mut TrackerState, cause: CompletionCause) -> Vec<Effect> {
    state.complete();
    vec![
        Effect::Emit(Status::ProgressComplete),
        Effect::Retire { cause },
    ]
}
