//! Per-transfer timelines.
//!
//! A `Timeline` is the time-sorted event list of one transfer with every
//! timestamp rewritten relative to the earliest event, so the first event
//! is always at 0.

use crate::error::ProfileError;
use crate::event::{DetailEvent, Event, TransferId};
use crate::group::TransferEvents;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub transfer: TransferId,
    pub events: Vec<Event>,
    pub details: Vec<DetailEvent>,
}

/// Stable-sort `events` by timestamp and rebase them on the earliest one.
///
/// Timestamps are non-negative (see the extractor), so `ts - base` cannot
/// overflow. Returns the absolute timestamp that became 0, or `None` for an empty
/// slice.
pub fn normalize_events(events: &mut [Event]) -> Option<i64> {
    events.sort_by_key(|e| e.ts);
    let base = events.first()?.ts;
    for event in events.iter_mut() {
        event.ts -= base;
    }
    Some(base)
}

impl Timeline {
    pub fn normalize(group: TransferEvents) -> Result<Self, ProfileError> {
        let TransferEvents {
            transfer,
            mut events,
            details,
        } = group;

        let Some(base) = normalize_events(&mut events) else {
            return Err(ProfileError::EmptyTransfer { transfer });
        };
        tracing::trace!("Transfer {} starts at {}", transfer, base);

        Ok(Timeline {
            transfer,
            events,
            details,
        })
    }

    /// Relative timestamp of the last event.
    pub fn duration(&self) -> i64 {
        self.events.last().map_or(0, |e| e.ts)
    }

    /// Events of the given kind, in timeline order.
    pub fn events_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind() == kind)
    }
}
