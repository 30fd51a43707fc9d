//! Profiler line extraction.
//!
//! The storage node exports its transfer checkpoints as Prometheus text
//! samples, one per line:
//!
//! ```text
//! file_download_profiler{checkpoint="v05ahm5...:SND_FILE_DATA:1"} 1.6281734187e+15
//! file_download_profiler{checkpoint="v05ahm5...:RCV_PROGRESS_DETAIL:1"} 33554432
//! ```
//!
//! The checkpoint label carries the transfer id and the event label. Timing
//! lines carry an absolute timestamp, detail lines an integer measurement.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::direction::DirectionSpec;
use crate::event::{split_label, DetailEvent, Event, TransferId};

/// Everything after the metric prefix of a profiler sample.
/// Pattern: {...checkpoint="<transfer>:<label>"...} <value> [<sample ts>]
static SAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^[A-Za-z0-9_]*\{[^}]*checkpoint="([^:"]+):([^"]*)"[^}]*\}\s+(\S+)(?:\s+-?\d+)?\s*$"#,
    )
    .expect("Invalid profiler sample regex pattern")
});

/// Counters describing one extraction pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub lines: u64,
    pub timing: u64,
    pub detail: u64,
    pub malformed: u64,
    pub ignored: u64,
}

/// Structured output of the extractor.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Transfer ids in order of first appearance.
    pub transfers: Vec<TransferId>,
    pub events: Vec<Event>,
    pub details: Vec<DetailEvent>,
    pub stats: ExtractStats,
}

/// Result of classifying a single line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Timing(Event),
    Detail(DetailEvent),
    /// Starts like a profiler sample but does not fully match. The transfer
    /// is reported when the checkpoint label could still be read.
    Malformed(Option<TransferId>),
    Ignored,
}

/// Parse a sample value as a timestamp. The exporter writes large values in
/// float notation (`1.6281734187e+15`), so both forms are accepted.
///
/// Timestamps are epoch based and must not be negative; this keeps every
/// `ts - first` of a transfer within `i64`.
fn parse_timestamp(value: &str) -> Option<i64> {
    let ts = match value.parse::<i64>() {
        Ok(ts) => ts,
        Err(_) => {
            let ts = value.parse::<f64>().ok()?;
            if !ts.is_finite() || ts >= i64::MAX as f64 {
                return None;
            }
            ts as i64
        }
    };
    (ts >= 0).then_some(ts)
}

pub struct Extractor<'a> {
    spec: &'a DirectionSpec,
}

impl<'a> Extractor<'a> {
    pub fn new(spec: &'a DirectionSpec) -> Self {
        Extractor { spec }
    }

    pub fn classify(&self, line: &str) -> Line {
        let Some(rest) = line.strip_prefix(self.spec.metric_prefix.as_str()) else {
            return Line::Ignored;
        };
        let Some(caps) = SAMPLE_RE.captures(rest) else {
            return Line::Malformed(None);
        };

        let transfer = TransferId::new(&caps[1]);
        let label = &caps[2];
        let value = &caps[3];
        let (kind, token) = split_label(label);

        if kind.is_empty() {
            return Line::Malformed(Some(transfer));
        }

        if self.spec.is_detail_kind(kind) {
            let (Some(token), Ok(value)) = (token, value.parse::<i64>()) else {
                return Line::Malformed(Some(transfer));
            };
            return Line::Detail(DetailEvent {
                transfer,
                kind: kind.to_string(),
                token: token.to_string(),
                value,
            });
        }

        match parse_timestamp(value) {
            Some(ts) => Line::Timing(Event::new(transfer, label, ts)),
            None => Line::Malformed(Some(transfer)),
        }
    }

    /// Extract every event from a complete log.
    pub fn extract(&self, input: &str) -> Extraction {
        let mut out = Extraction::default();
        let mut seen = HashSet::new();
        let mut discover = |out: &mut Extraction, transfer: &TransferId| {
            if seen.insert(transfer.clone()) {
                out.transfers.push(transfer.clone());
            }
        };

        for (lineno, line) in input.lines().enumerate() {
            out.stats.lines += 1;
            match self.classify(line) {
                Line::Timing(event) => {
                    discover(&mut out, &event.transfer);
                    out.stats.timing += 1;
                    out.events.push(event);
                }
                Line::Detail(detail) => {
                    discover(&mut out, &detail.transfer);
                    out.stats.detail += 1;
                    out.details.push(detail);
                }
                Line::Malformed(transfer) => {
                    tracing::debug!("Skipping malformed profiler line {}: {}", lineno + 1, line);
                    if let Some(transfer) = transfer {
                        discover(&mut out, &transfer);
                    }
                    out.stats.malformed += 1;
                }
                Line::Ignored => out.stats.ignored += 1,
            }
        }
        out
    }
}

/// Pick the built-in direction whose metric prefix appears first in the log.
pub fn detect_direction(input: &str) -> Option<DirectionSpec> {
    let builtin = DirectionSpec::builtin();
    input.lines().find_map(|line| {
        builtin
            .iter()
            .find(|spec| line.starts_with(spec.metric_prefix.as_str()))
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download_line(label: &str, value: &str) -> String {
        format!("file_download_profiler{{checkpoint=\"v05abc:{label}\"}} {value}")
    }

    #[test]
    fn test_classify_timing_float() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        let line = download_line("SND_FILE_DATA:1", "1.6281734187e+15");
        match extractor.classify(&line) {
            Line::Timing(event) => {
                assert_eq!(event.transfer.as_str(), "v05abc");
                assert_eq!(event.label, "SND_FILE_DATA:1");
                assert_eq!(event.ts, 1_628_173_418_700_000);
                assert!(event.attachments.is_empty());
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_timing_integer() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        let line = download_line("RCV_SAVE_DATA:64:", "1628173418700123456");
        match extractor.classify(&line) {
            Line::Timing(event) => {
                assert_eq!(event.label, "RCV_SAVE_DATA:64:");
                assert_eq!(event.ts, 1_628_173_418_700_123_456);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_negative_timestamp() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        for value in ["-5", "-1.5e+15", "inf", "1e300"] {
            let line = download_line("SND_FILE_DATA:1", value);
            assert_eq!(
                extractor.classify(&line),
                Line::Malformed(Some("v05abc".into())),
                "{value}"
            );
        }
    }

    #[test]
    fn test_classify_detail() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        let line = download_line("RCV_PROGRESS_DETAIL:4", "33554432");
        assert_eq!(
            extractor.classify(&line),
            Line::Detail(DetailEvent {
                transfer: "v05abc".into(),
                kind: "RCV_PROGRESS_DETAIL".to_string(),
                token: "4".to_string(),
                value: 33554432,
            })
        );
    }

    #[test]
    fn test_classify_detail_without_token() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        let line = download_line("RCV_PROGRESS_DETAIL:", "10");
        assert_eq!(
            extractor.classify(&line),
            Line::Malformed(Some("v05abc".into()))
        );
    }

    #[test]
    fn test_classify_other_lines() {
        let spec = DirectionSpec::download();
        let extractor = Extractor::new(&spec);
        assert_eq!(extractor.classify("# HELP something"), Line::Ignored);
        assert_eq!(
            extractor.classify("file_upload_profiler{checkpoint=\"v05abc:SND_FILE_DATA:1\"} 1"),
            Line::Ignored
        );
        assert_eq!(
            extractor.classify("file_download_profiler{checkpoint=\"v05abc"),
            Line::Malformed(None)
        );
        assert_eq!(
            extractor.classify(&download_line("SND_FILE_DATA:1", "NaN")),
            Line::Malformed(Some("v05abc".into()))
        );
    }

    #[test]
    fn test_classify_extra_labels_and_sample_ts() {
        let spec = DirectionSpec::upload();
        let extractor = Extractor::new(&spec);
        let line = "file_upload_profiler{node=\"pp1\",checkpoint=\"v05xyz:RCV_RSP_UPLOAD_SP\",job=\"sds\"} 42 1628173418700";
        match extractor.classify(line) {
            Line::Timing(event) => {
                assert_eq!(event.transfer.as_str(), "v05xyz");
                assert_eq!(event.label, "RCV_RSP_UPLOAD_SP");
                assert_eq!(event.ts, 42);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_extract_discovery_order_and_stats() {
        let spec = DirectionSpec::download();
        let input = [
            "# TYPE file_download_profiler gauge".to_string(),
            "file_download_profiler{checkpoint=\"v05b:RCV_CMD_START:\"} 100".to_string(),
            "file_download_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 200".to_string(),
            "file_download_profiler{checkpoint=\"v05b:RCV_PROGRESS_DETAIL:1\"} 7".to_string(),
            "file_download_profiler{checkpoint=\"v05c:SND_FILE_DATA:1\"} bogus".to_string(),
            "file_download_profiler garbage".to_string(),
        ]
        .join("\n");

        let extraction = Extractor::new(&spec).extract(&input);
        let ids: Vec<&str> = extraction.transfers.iter().map(TransferId::as_str).collect();
        assert_eq!(ids, vec!["v05b", "v05a", "v05c"]);
        assert_eq!(extraction.events.len(), 2);
        assert_eq!(extraction.details.len(), 1);
        assert_eq!(
            extraction.stats,
            ExtractStats {
                lines: 6,
                timing: 2,
                detail: 1,
                malformed: 2,
                ignored: 1,
            }
        );
    }

    #[test]
    fn test_extract_empty_input() {
        let spec = DirectionSpec::upload();
        let extraction = Extractor::new(&spec).extract("");
        assert!(extraction.transfers.is_empty());
        assert!(extraction.events.is_empty());
        assert_eq!(extraction.stats, ExtractStats::default());
    }

    #[test]
    fn test_detect_direction() {
        let input = "junk\nfile_upload_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 1\n";
        assert_eq!(detect_direction(input).map(|s| s.name), Some("upload".to_string()));
        let input = "file_download_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 1\n";
        assert_eq!(
            detect_direction(input).map(|s| s.name),
            Some("download".to_string())
        );
        assert_eq!(detect_direction("nothing here"), None);
    }
}
