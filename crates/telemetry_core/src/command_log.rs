//! Per-channel rolling log of backend command activity.
//!
//! The retained history is bounded (oldest evicted first) while the counters
//! are cumulative: eviction never lowers `total` or a per-kind count. Only
//! `clear` resets a channel.
use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::ChannelId;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// One observed backend command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLog {
    events: VecDeque<CommandEvent>,
    counts_by_kind: BTreeMap<String, u64>,
    total: u64,
    capacity: usize,
}

impl CommandLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            counts_by_kind: BTreeMap::new(),
            total: 0,
            capacity,
        }
    }

    fn record(&mut self, event: CommandEvent) {
        *self.counts_by_kind.entry(event.kind.clone()).or_insert(0) += 1;
        self.total += 1;
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    fn clear(&mut self) {
        self.events.clear();
        self.counts_by_kind.clear();
        self.total = 0;
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &CommandEvent> + ExactSizeIterator {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn counts_by_kind(&self) -> &BTreeMap<String, u64> {
        &self.counts_by_kind
    }

    pub fn count(&self, kind: &str) -> u64 {
        self.counts_by_kind.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Owns one [`CommandLog`] per channel, created lazily on first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogTracker {
    logs: BTreeMap<ChannelId, CommandLog>,
    capacity: usize,
}

impl Default for CommandLogTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl CommandLogTracker {
    /// A zero capacity is raised to one so every channel keeps its latest event.
    pub fn new(capacity: usize) -> Self {
        Self {
            logs: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, channel: &ChannelId, kind: impl Into<String>, timestamp: DateTime<Utc>) {
        let capacity = self.capacity;
        self.logs
            .entry(channel.clone())
            .or_insert_with(|| CommandLog::new(capacity))
            .record(CommandEvent {
                kind: kind.into(),
                timestamp,
            });
    }

    pub fn clear(&mut self, channel: &ChannelId) {
        if let Some(log) = self.logs.get_mut(channel) {
            log.clear();
        }
    }

    pub fn log(&self, channel: &ChannelId) -> Option<&CommandLog> {
        self.logs.get(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.logs.keys()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
