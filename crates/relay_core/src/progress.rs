use std::sync::LazyLock;

use regex::Regex;

/// Percentage at or above which a rendered progress line counts as finished.
pub const COMPLETE_PERCENT: u64 = 100;

static PROGRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)% Complete").expect("progress pattern is valid"));

/// A completion percentage read out of rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSignal {
    /// Parsed integer, not clamped to 0..=100.
    pub value: u64,
    /// The matched text, e.g. `"45% Complete"`.
    pub raw: String,
}

impl ProgressSignal {
    pub fn is_complete(&self) -> bool {
        self.value >= COMPLETE_PERCENT
    }
}

/// Finds the first `<digits>% Complete` in `text`.
///
/// A digit run too long for `u64` is treated the same as no match.
pub fn extract_progress(text: &str) -> Option<ProgressSignal> {
    let caps = PROGRESS_PATTERN.captures(text)?;
    let value = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let raw = caps.get(0)?.as_str().to_string();
    Some(ProgressSignal { value, raw })
}
