use crate::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Emit(Status),
    /// Tracker reached `Complete`; drop the binding and leave the tracked set.
    Retire { cause: CompletionCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCause {
    ExplicitComplete,
    SilenceTimeout,
}
