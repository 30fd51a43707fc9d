//! Send/receive pairing by sequence token.
//!
//! For each configured pair the correlator links a send event to the
//! receive event carrying the same token and appends the elapsed time to
//! the receive event. When the pair names a detail kind and a detail sample
//! with that token exists for the transfer, its value is appended as well.
//!
//! Matching is first-match-wins: per token, only the chronologically first
//! receive is ever eligible, and it is linked to the first send with that
//! token whose timestamp is not later than the receive's. A send and receive
//! sharing a timestamp pair up regardless of their order in the log. Later
//! receives and later sends reusing a token stay unpaired.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::direction::PairSpec;
use crate::timeline::Timeline;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrelationStats {
    /// Send events linked to a receive.
    pub paired: u64,
    /// Send events with no eligible receive.
    pub unresolved: u64,
    /// Paired receives whose pair expects a detail value that never showed up.
    pub missing_detail: u64,
}

impl std::ops::AddAssign for CorrelationStats {
    fn add_assign(&mut self, other: Self) {
        self.paired += other.paired;
        self.unresolved += other.unresolved;
        self.missing_detail += other.missing_detail;
    }
}

struct Link {
    receive: usize,
    interval: i64,
    detail: Option<i64>,
}

fn find_links(timeline: &Timeline, pair: &PairSpec, stats: &mut CorrelationStats) -> Vec<Link> {
    let mut receives: HashMap<&str, usize> = HashMap::new();
    for (i, event) in timeline.events.iter().enumerate() {
        if event.kind() != pair.receive {
            continue;
        }
        if let Some(token) = event.token() {
            receives.entry(token).or_insert(i);
        }
    }

    let mut details: HashMap<&str, i64> = HashMap::new();
    if let Some(kind) = pair.detail.as_deref() {
        for detail in timeline.details.iter().filter(|d| d.kind == kind) {
            details.entry(detail.token.as_str()).or_insert(detail.value);
        }
    }

    let mut linked = HashSet::new();
    let mut links = Vec::new();
    for event in &timeline.events {
        if event.kind() != pair.send {
            continue;
        }
        let Some(token) = event.token() else {
            continue;
        };
        match receives.get(token) {
            Some(&r) if timeline.events[r].ts >= event.ts && linked.insert(r) => {
                let detail = details.get(token).copied();
                if pair.detail.is_some() && detail.is_none() {
                    stats.missing_detail += 1;
                }
                stats.paired += 1;
                links.push(Link {
                    receive: r,
                    interval: timeline.events[r].ts - event.ts,
                    detail,
                });
            }
            _ => {
                stats.unresolved += 1;
                tracing::trace!(
                    "Transfer {}: {} has no matching {}",
                    timeline.transfer,
                    event.label,
                    pair.receive
                );
            }
        }
    }
    links
}

/// Correlate every configured pair on a normalized timeline.
pub fn correlate(timeline: &mut Timeline, pairs: &[PairSpec]) -> CorrelationStats {
    let mut stats = CorrelationStats::default();
    for pair in pairs {
        let links = find_links(timeline, pair, &mut stats);
        for link in links {
            let attachments = &mut timeline.events[link.receive].attachments;
            attachments.push(link.interval);
            if let Some(detail) = link.detail {
                attachments.push(detail);
            }
        }
    }
    stats
}
