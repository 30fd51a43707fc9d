use std::collections::HashMap;

use crate::event::{DetailEvent, Event, TransferId};
use crate::extract::Extraction;

/// Raw events of one transfer, in input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferEvents {
    pub transfer: TransferId,
    pub events: Vec<Event>,
    pub details: Vec<DetailEvent>,
}

/// Partition the extracted events by transfer.
///
/// One group is produced per discovered transfer, in discovery order, even
/// when the transfer ended up without timing events; the normalizer rejects
/// those. Events whose transfer was never discovered get a group appended
/// after the discovered ones.
pub fn group_transfers(extraction: Extraction) -> Vec<TransferEvents> {
    let mut groups: Vec<TransferEvents> = Vec::with_capacity(extraction.transfers.len());
    let mut index: HashMap<TransferId, usize> = HashMap::new();

    for transfer in extraction.transfers {
        if index.contains_key(&transfer) {
            continue;
        }
        index.insert(transfer.clone(), groups.len());
        groups.push(TransferEvents {
            transfer,
            ..Default::default()
        });
    }

    let mut slot = |groups: &mut Vec<TransferEvents>, transfer: &TransferId| -> usize {
        *index.entry(transfer.clone()).or_insert_with(|| {
            groups.push(TransferEvents {
                transfer: transfer.clone(),
                ..Default::default()
            });
            groups.len() - 1
        })
    };

    for event in extraction.events {
        let i = slot(&mut groups, &event.transfer);
        groups[i].events.push(event);
    }
    for detail in extraction.details {
        let i = slot(&mut groups, &detail.transfer);
        groups[i].details.push(detail);
    }

    groups
}
