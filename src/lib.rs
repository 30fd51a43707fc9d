//! xferlat library - the correlation and latency-derivation engine behind
//! the `xferlat` binary.
//!
//! Profiler logs go through a fixed chain of stages:
//!
//! - [`extract`] - pattern matching of profiler lines into events
//! - [`group`] - partitioning events by transfer
//! - [`timeline`] - time-sorting and rebasing each transfer on its first event
//! - [`correlate`] - pairing send and receive events by sequence token
//! - [`analyze`] - deriving the latency metrics of each transfer
//! - [`report`] - record file and summary output
//!
//! What pairs up and which metrics are derived is described by a
//! [`DirectionSpec`]; downloads and uploads differ only in their descriptor.
//!
//! # Example
//!
//! ```
//! use xferlat::{process, DirectionSpec};
//!
//! let log = "\
//! file_download_profiler{checkpoint=\"v05a:SND_STORAGE_INFO_SP:\"} 900
//! file_download_profiler{checkpoint=\"v05a:RCV_STORAGE_INFO_SP:\"} 950
//! ";
//! let report = process(log, &DirectionSpec::download()).unwrap();
//! assert_eq!(report.results[0].get("request"), Some(50));
//! ```

pub mod analyze;
pub mod config;
pub mod correlate;
pub mod direction;
pub mod error;
pub mod event;
pub mod extract;
pub mod group;
pub mod pipeline;
pub mod report;
pub mod timeline;

pub use analyze::{AnalysisResult, Metric};
pub use config::Config;
pub use direction::{DirectionChoice, DirectionSpec, MetricRule, MetricSpec, PairSpec};
pub use error::ProfileError;
pub use event::{DetailEvent, Event, TransferId};
pub use pipeline::{process, run, Report};
pub use report::OutputFormat;
pub use timeline::Timeline;
