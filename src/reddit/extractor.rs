use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::models::{EntryKind, RedditGameEntry};
use crate::reddit::bloom::BloomFilter;

pub const MAX_GAME_ENTRIES: usize = 512;
const BLOOM_HASHES: u32 = 3;

static COMMAND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i).addlicense\s+(?:asf)?\s*((?:[sa]/\d+\s*,?\s*)+)")
        .expect("Invalid addlicense command regex")
});
static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[sa]/\d+").expect("Invalid identifier regex"));
static PERMANENTLY_FREE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)permanently\s+free").expect("Invalid free-to-play regex"));
static DLC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)free\s+dlc\s+for\s+a").expect("Invalid dlc regex"));

/// Bounded, deduplicating accumulator for one extraction run.
struct EntryBuffer {
    entries: Vec<RedditGameEntry>,
    capacity: usize,
    filter: BloomFilter,
}

impl EntryBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            filter: BloomFilter::new(BLOOM_HASHES),
        }
    }

    fn position_of(&self, identifier: &str) -> Option<usize> {
        if !self.filter.may_contain(identifier.as_bytes()) {
            return None;
        }
        self.entries
            .iter()
            .position(|entry| entry.identifier == identifier)
    }

    fn merge(&mut self, candidate: RedditGameEntry) {
        if let Some(index) = self.position_of(&candidate.identifier) {
            let existing = &mut self.entries[index];
            if candidate.date > existing.date {
                existing.date = candidate.date;
            }
            return;
        }

        self.filter.insert(candidate.identifier.as_bytes());
        self.entries.push(candidate);
        while self.entries.len() > self.capacity {
            self.entries.pop();
        }
    }

    fn into_entries(self) -> Vec<RedditGameEntry> {
        self.entries
    }
}

pub(crate) fn classify_body(body: &str) -> EntryKind {
    if DLC_REGEX.is_match(body) {
        return EntryKind::DLC;
    }
    if PERMANENTLY_FREE_REGEX.is_match(body) {
        return EntryKind::FREE_TO_PLAY;
    }
    EntryKind::NONE
}

/// Epoch seconds of a comment. Negative, non-finite or out-of-range values
/// count as unknown (0).
fn comment_timestamp(data: &Value) -> i64 {
    ["created_utc", "created"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find_map(|value| {
            value.as_i64().or_else(|| {
                value
                    .as_f64()
                    .filter(|secs| secs.is_finite() && (0.0..i64::MAX as f64).contains(secs))
                    .map(|secs| secs as i64)
            })
        })
        .map(|secs| secs.max(0))
        .unwrap_or(0)
}

/// Raw identifier tokens of every addlicense command in `body`, in order.
pub(crate) fn command_tokens(body: &str) -> Vec<&str> {
    COMMAND_REGEX
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .flat_map(|list| IDENTIFIER_REGEX.find_iter(list.as_str()))
        .map(|token| token.as_str())
        .collect()
}

#[derive(Debug, Clone)]
pub struct GameEntryExtractor {
    capacity: usize,
}

impl GameEntryExtractor {
    pub fn new() -> Self {
        Self::with_capacity(MAX_GAME_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Turns listing children (`[{ "data": { "body", "created_utc" } }]`) into
    /// deduplicated entries in first-encounter order.
    pub fn extract(&self, children: &[Value]) -> Vec<RedditGameEntry> {
        let mut buffer = EntryBuffer::with_capacity(self.capacity);

        for comment in children {
            let Some(data) = comment.get("data") else {
                continue;
            };
            let body = data.get("body").and_then(Value::as_str).unwrap_or_default();
            let tokens = command_tokens(body);
            if tokens.is_empty() {
                continue;
            }

            let kind = classify_body(body);
            let date = comment_timestamp(data);
            for token in tokens {
                buffer.merge(RedditGameEntry::new(token, kind, date));
            }
        }

        buffer.into_entries()
    }
}

impl Default for GameEntryExtractor {
    fn default() -> Self {
        Self::new()
    }
}
