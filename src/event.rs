//! Structured events produced by the extractor.
//!
//! A profiler label looks like `SND_FILE_DATA:1`, `RCV_SLICE_DATA:33554432:`
//! or `SND_STORAGE_INFO_SP:`. The text before the first `:` is the event
//! kind; whatever follows, minus a trailing `:`, is the sequence token used
//! to pair a send with its receive.

use std::fmt;

use serde::Serialize;

/// Attachment slot holding the send→receive interval.
pub const ATTACHMENT_INTERVAL: usize = 0;
/// Attachment slot holding the detail value joined by token.
pub const ATTACHMENT_DETAIL: usize = 1;

/// Opaque identifier of one transfer (the checkpoint file hash).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    pub fn new(id: impl Into<String>) -> Self {
        TransferId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferId {
    fn from(id: &str) -> Self {
        TransferId(id.to_string())
    }
}

/// Split a label into its kind and optional sequence token.
///
/// ```
/// use xferlat::event::split_label;
///
/// assert_eq!(split_label("SND_FILE_DATA:1"), ("SND_FILE_DATA", Some("1")));
/// assert_eq!(split_label("RCV_SAVE_DATA:64:"), ("RCV_SAVE_DATA", Some("64")));
/// assert_eq!(split_label("SND_STORAGE_INFO_SP:"), ("SND_STORAGE_INFO_SP", None));
/// assert_eq!(split_label("RCV_RSP_UPLOAD_SP"), ("RCV_RSP_UPLOAD_SP", None));
/// ```
pub fn split_label(label: &str) -> (&str, Option<&str>) {
    match label.split_once(':') {
        Some((kind, rest)) => {
            let token = rest.strip_suffix(':').unwrap_or(rest);
            if token.is_empty() {
                (kind, None)
            } else {
                (kind, Some(token))
            }
        }
        None => (label, None),
    }
}

/// A timestamped checkpoint of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub transfer: TransferId,
    pub label: String,
    /// Absolute after extraction, transfer-relative after normalization.
    pub ts: i64,
    /// Values appended by the correlator, see `ATTACHMENT_*`.
    pub attachments: Vec<i64>,
}

impl Event {
    pub fn new(transfer: TransferId, label: impl Into<String>, ts: i64) -> Self {
        Event {
            transfer,
            label: label.into(),
            ts,
            attachments: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        split_label(&self.label).0
    }

    pub fn token(&self) -> Option<&str> {
        split_label(&self.label).1
    }

    pub fn interval(&self) -> Option<i64> {
        self.attachments.get(ATTACHMENT_INTERVAL).copied()
    }

    pub fn detail(&self) -> Option<i64> {
        self.attachments.get(ATTACHMENT_DETAIL).copied()
    }
}

/// Supplementary measurement (usually a byte count) keyed by sequence token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailEvent {
    pub transfer: TransferId,
    pub kind: String,
    pub token: String,
    pub value: i64,
}
