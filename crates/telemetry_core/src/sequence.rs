//! Per-channel ordering of overlapping fetches.
//!
//! Every request is tagged with a sequence number from its channel. A
//! completion is applied only if its number is above the channel's watermark
//! (the highest number applied so far); anything at or below it is stale.
use std::collections::BTreeMap;

use crate::RequestSpec;

pub type RequestSeq = u64;

/// Outcome of offering a completed request to its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Newest result so far; the watermark now points at it.
    Fresh(RequestSpec),
    /// A newer result has already been applied.
    Stale,
    /// Not issued by this channel, or already resolved.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelSequencer {
    last_issued: RequestSeq,
    highest_applied: Option<RequestSeq>,
    pending: BTreeMap<RequestSeq, RequestSpec>,
}

impl ChannelSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a new request. Numbers start at 1 and never repeat.
    pub fn issue(&mut self, request: RequestSpec) -> RequestSeq {
        self.last_issued += 1;
        self.pending.insert(self.last_issued, request);
        self.last_issued
    }

    pub fn admit(&mut self, seq: RequestSeq) -> Admission {
        let Some(request) = self.pending.remove(&seq) else {
            return Admission::Unknown;
        };
        if self.highest_applied.is_some_and(|applied| seq <= applied) {
            return Admission::Stale;
        }
        self.highest_applied = Some(seq);
        Admission::Fresh(request)
    }

    pub fn highest_applied(&self) -> Option<RequestSeq> {
        self.highest_applied
    }

    pub fn last_issued(&self) -> RequestSeq {
        self.last_issued
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_completions_are_all_fresh() {
        let mut seq = ChannelSequencer::new();
        let a = seq.issue(RequestSpec::Sessions);
        let b = seq.issue(RequestSpec::Sessions);
        assert_eq!((a, b), (1, 2));
        assert_eq!(seq.admit(a), Admission::Fresh(RequestSpec::Sessions));
        assert_eq!(seq.admit(b), Admission::Fresh(RequestSpec::Sessions));
        assert_eq!(seq.highest_applied(), Some(2));
        assert_eq!(seq.in_flight(), 0);
    }

    #[test]
    fn older_completion_after_newer_is_stale() {
        let mut seq = ChannelSequencer::new();
        let a = seq.issue(RequestSpec::SessionMetrics);
        let b = seq.issue(RequestSpec::Sessions);

        assert_eq!(seq.admit(b), Admission::Fresh(RequestSpec::Sessions));
        assert_eq!(seq.admit(a), Admission::Stale);
        assert_eq!(seq.highest_applied(), Some(b));
        assert_eq!(seq.in_flight(), 0);
    }

    #[test]
    fn unknown_and_repeated_numbers_are_ignored() {
        let mut seq = ChannelSequencer::new();
        assert_eq!(seq.admit(9), Admission::Unknown);
        let a = seq.issue(RequestSpec::Sessions);
        assert!(matches!(seq.admit(a), Admission::Fresh(_)));
        assert_eq!(seq.admit(a), Admission::Unknown);
    }
}
