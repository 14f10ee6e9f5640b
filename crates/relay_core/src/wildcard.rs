use std::collections::HashMap;
use std::sync::LazyLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("placeholder pattern is valid"));

/// Named word lists substituted into `[KEY]` placeholders of a prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wildcards {
    entries: HashMap<String, Vec<String>>,
}

impl Wildcards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contents` (one option per line) under `key`.
    ///
    /// Keys are case-insensitive; blank lines are dropped and the rest trimmed.
    pub fn insert(&mut self, key: &str, contents: &str) {
        let options = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        self.entries.insert(key.to_uppercase(), options);
    }

    pub fn options(&self, key: &str) -> Option<&[String]> {
        self.entries.get(&key.to_uppercase()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces each known placeholder with a random option, recursing into
    /// the chosen option until `depth` is used up. Unknown or empty keys stay verbatim.
    pub fn expand<R: Rng + ?Sized>(&self, template: &str, depth: usize, rng: &mut R) -> String {
        if depth == 0 {
            return template.to_string();
        }
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                let choice = self
                    .entries
                    .get(&caps[1].to_uppercase())
                    .and_then(|options| options.choose(&mut *rng));
                match choice {
                    Some(option) => self.expand(option, depth - 1, &mut *rng),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
