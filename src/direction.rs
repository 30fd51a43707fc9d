//! Direction descriptors.
//!
//! Downloads and uploads go through the same engine; what differs is which
//! profiler metric the lines come from, which labels pair up, and which
//! metrics get derived. A `DirectionSpec` captures all of that. The two
//! built-in descriptors cover the profiler lines emitted by the storage
//! node, and custom descriptors can be loaded from JSON:
//!
//! ```json
//! {
//!   "name": "download",
//!   "metric_prefix": "file_download_profiler",
//!   "pairs": [
//!     { "send": "SND_FILE_DATA", "receive": "RCV_PROGRESS", "detail": "RCV_PROGRESS_DETAIL" },
//!     { "send": "RCV_SLICE_DATA", "receive": "RCV_SAVE_DATA" }
//!   ],
//!   "metrics": [
//!     { "name": "total", "rule": { "type": "total" } },
//!     { "name": "request", "rule": { "type": "request", "send": "SND_STORAGE_INFO_SP", "receive": "RCV_STORAGE_INFO_SP" } },
//!     { "name": "local write", "rule": { "type": "pair_sum", "receive": "RCV_SAVE_DATA" } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

pub const DOWNLOAD_METRIC_PREFIX: &str = "file_download_profiler";
pub const UPLOAD_METRIC_PREFIX: &str = "file_upload_profiler";

const SEND_FILE_DATA: &str = "SND_FILE_DATA";
const RECV_PROGRESS: &str = "RCV_PROGRESS";
const RECV_PROGRESS_DETAIL: &str = "RCV_PROGRESS_DETAIL";

/// Which direction to analyze, as requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionChoice {
    /// Pick from the first profiler line in the input.
    #[default]
    Auto,
    Download,
    Upload,
}

impl FromStr for DirectionChoice {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DirectionChoice::Auto),
            "download" => Ok(DirectionChoice::Download),
            "upload" => Ok(DirectionChoice::Upload),
            _ => Err(ProfileError::UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for DirectionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectionChoice::Auto => "auto",
            DirectionChoice::Download => "download",
            DirectionChoice::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// A send kind paired with a receive kind by sequence token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairSpec {
    pub send: String,
    pub receive: String,
    /// Detail label whose value is joined onto the receive event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PairSpec {
    fn new(send: &str, receive: &str, detail: Option<&str>) -> Self {
        PairSpec {
            send: send.to_string(),
            receive: receive.to_string(),
            detail: detail.map(str::to_string),
        }
    }
}

/// How a single metric is derived from a correlated timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricRule {
    /// Relative timestamp of the last event.
    Total,
    /// First `send`, then the first `receive` after it.
    Request { send: String, receive: String },
    /// Sum of paired intervals recorded on `receive` events.
    PairSum { receive: String },
    /// Sum of detail values recorded on `receive` events.
    DetailSum { receive: String },
    /// Last `last` event minus first `first` event.
    Span { first: String, last: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    pub name: String,
    pub rule: MetricRule,
}

impl MetricSpec {
    fn new(name: &str, rule: MetricRule) -> Self {
        MetricSpec {
            name: name.to_string(),
            rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionSpec {
    pub name: String,
    /// Prometheus metric name the profiler lines start with.
    pub metric_prefix: String,
    pub pairs: Vec<PairSpec>,
    pub metrics: Vec<MetricSpec>,
}

impl DirectionSpec {
    pub fn download() -> Self {
        DirectionSpec {
            name: "download".to_string(),
            metric_prefix: DOWNLOAD_METRIC_PREFIX.to_string(),
            pairs: vec![
                PairSpec::new(SEND_FILE_DATA, RECV_PROGRESS, Some(RECV_PROGRESS_DETAIL)),
                PairSpec::new("RCV_SLICE_DATA", "RCV_SAVE_DATA", None),
            ],
            metrics: vec![
                MetricSpec::new("total", MetricRule::Total),
                MetricSpec::new(
                    "request",
                    MetricRule::Request {
                        send: "SND_STORAGE_INFO_SP".to_string(),
                        receive: "RCV_STORAGE_INFO_SP".to_string(),
                    },
                ),
                MetricSpec::new(
                    "local write",
                    MetricRule::PairSum {
                        receive: "RCV_SAVE_DATA".to_string(),
                    },
                ),
            ],
        }
    }

    pub fn upload() -> Self {
        DirectionSpec {
            name: "upload".to_string(),
            metric_prefix: UPLOAD_METRIC_PREFIX.to_string(),
            pairs: vec![
                PairSpec::new(SEND_FILE_DATA, RECV_PROGRESS, Some(RECV_PROGRESS_DETAIL)),
                PairSpec::new("SND_GET_LOCAL_DATA", "RCV_GET_LOCAL_DATA", None),
                PairSpec::new("SND_GET_REMOTE_DATA", "RCV_GET_REMOTE_DATA", None),
            ],
            metrics: vec![
                MetricSpec::new("total", MetricRule::Total),
                MetricSpec::new(
                    "file request",
                    MetricRule::Request {
                        send: "SND_REQ_UPLOAD_SP".to_string(),
                        receive: "RCV_RSP_UPLOAD_SP".to_string(),
                    },
                ),
                MetricSpec::new(
                    "local read",
                    MetricRule::PairSum {
                        receive: "RCV_GET_LOCAL_DATA".to_string(),
                    },
                ),
                MetricSpec::new(
                    "storage handle",
                    MetricRule::DetailSum {
                        receive: RECV_PROGRESS.to_string(),
                    },
                ),
                MetricSpec::new(
                    "data transmit",
                    MetricRule::Span {
                        first: SEND_FILE_DATA.to_string(),
                        last: RECV_PROGRESS.to_string(),
                    },
                ),
            ],
        }
    }

    /// Built-in descriptors, in auto-detection order.
    pub fn builtin() -> Vec<DirectionSpec> {
        vec![DirectionSpec::download(), DirectionSpec::upload()]
    }

    /// Resolve a non-auto choice to its built-in descriptor.
    pub fn for_choice(choice: DirectionChoice) -> Option<DirectionSpec> {
        match choice {
            DirectionChoice::Auto => None,
            DirectionChoice::Download => Some(DirectionSpec::download()),
            DirectionChoice::Upload => Some(DirectionSpec::upload()),
        }
    }

    /// Metric names in output order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }

    /// Every label kind that marks a detail line.
    pub fn detail_kinds(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().filter_map(|p| p.detail.as_deref())
    }

    pub fn is_detail_kind(&self, kind: &str) -> bool {
        self.detail_kinds().any(|d| d == kind)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: String| ProfileError::InvalidDirection {
            direction: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if self.metric_prefix.is_empty() {
            return Err(invalid("metric_prefix must not be empty".to_string()));
        }
        if self.metrics.is_empty() {
            return Err(invalid("at least one metric is required".to_string()));
        }

        let mut receives = HashSet::new();
        for pair in &self.pairs {
            if pair.send.is_empty() || pair.receive.is_empty() {
                return Err(invalid("pair kinds must not be empty".to_string()));
            }
            if pair.send == pair.receive {
                return Err(invalid(format!(
                    "pair {} cannot use the same kind on both sides",
                    pair.send
                )));
            }
            if !receives.insert(pair.receive.as_str()) {
                return Err(invalid(format!(
                    "receive kind {} is used by more than one pair",
                    pair.receive
                )));
            }
        }

        let mut names = HashSet::new();
        for metric in &self.metrics {
            if !names.insert(metric.name.as_str()) {
                return Err(invalid(format!("metric {} already exists", metric.name)));
            }
            match &metric.rule {
                MetricRule::PairSum { receive } => {
                    if !receives.contains(receive.as_str()) {
                        return Err(invalid(format!(
                            "metric {} sums {} which is not a paired receive kind",
                            metric.name, receive
                        )));
                    }
                }
                MetricRule::DetailSum { receive } => {
                    let has_detail = self
                        .pairs
                        .iter()
                        .any(|p| &p.receive == receive && p.detail.is_some());
                    if !has_detail {
                        return Err(invalid(format!(
                            "metric {} sums details of {} but no pair joins a detail onto it",
                            metric.name, receive
                        )));
                    }
                }
                MetricRule::Total | MetricRule::Request { .. } | MetricRule::Span { .. } => {}
            }
        }
        Ok(())
    }

    pub fn from_json(buf: &str) -> Result<Self> {
        let spec: DirectionSpec =
            serde_json::from_str(buf).context("Failed to parse direction descriptor")?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let buf = fs::read_to_string(path)
            .with_context(|| format!("Failed to read direction descriptor {}", path.display()))?;
        Self::from_json(&buf)
    }
}
