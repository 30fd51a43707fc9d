//! Error types for the correlation pipeline.
//!
//! Only conditions that abort a run are modelled here. Malformed lines and
//! unresolved send/receive pairs are expected in real logs and are counted
//! or logged instead of being raised.

use crate::event::TransferId;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// A transfer was discovered in the log but none of its lines carried a
    /// usable timestamp, so there is nothing to anchor relative time on.
    #[error("transfer {transfer} has no timing events")]
    EmptyTransfer { transfer: TransferId },

    /// A direction descriptor failed validation.
    #[error("invalid direction '{direction}': {reason}")]
    InvalidDirection { direction: String, reason: String },

    #[error("unknown direction '{0}' (expected auto, download or upload)")]
    UnknownDirection(String),
}
