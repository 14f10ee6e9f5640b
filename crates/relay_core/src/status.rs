use std::fmt;

use serde::{Deserialize, Serialize};

const PROMPT_RECEIVED: &str = "prompt_received";
const INPUT_COMPLETE: &str = "input_complete";
const PROGRESS_COMPLETE: &str = "progress_complete";

/// Lifecycle marker reported to the controller for one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    PromptReceived,
    InputComplete,
    /// Raw progress text such as `"45% Complete"`.
    Progress(String),
    /// Terminal marker; sent at most once per tracked request.
    ProgressComplete,
}

impl Status {
    pub fn as_wire(&self) -> &str {
        match self {
            Status::PromptReceived => PROMPT_RECEIVED,
            Status::InputComplete => INPUT_COMPLETE,
            Status::Progress(raw) => raw,
            Status::ProgressComplete => PROGRESS_COMPLETE,
        }
    }

    /// Any string that is not one of the fixed markers is a progress line.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            PROMPT_RECEIVED => Status::PromptReceived,
            INPUT_COMPLETE => Status::InputComplete,
            PROGRESS_COMPLETE => Status::ProgressComplete,
            other => Status::Progress(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::ProgressComplete)
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        Status::from_wire(&raw)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Progress(raw) => raw,
            other => other.as_wire().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
