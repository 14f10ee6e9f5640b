use std::time::Instant;

/// Observations fed to one request's tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Discovery scan found a node for the request; carries its rendered text.
    CandidateFound { now: Instant, text: String },
    /// The bound node's subtree changed; carries its full rendered text.
    ContentChanged { now: Instant, text: String },
    /// The bound node left the tree.
    NodeDetached { now: Instant },
    /// Scan tick or silence-deadline wake-up.
    Tick { now: Instant },
}
