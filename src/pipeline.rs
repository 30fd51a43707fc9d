//! End-to-end run: extract → group → normalize → correlate → analyze →
//! report.
//!
//! The whole log is read and processed before anything is written, so a
//! fatal error leaves no partial record file behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use crate::analyze::{analyze, AnalysisResult};
use crate::config::Config;
use crate::correlate::{correlate, CorrelationStats};
use crate::direction::DirectionSpec;
use crate::error::ProfileError;
use crate::extract::{detect_direction, ExtractStats, Extractor};
use crate::group::group_transfers;
use crate::report::{write_records, write_summary};
use crate::timeline::Timeline;

/// Everything derived from one profiler log.
#[derive(Debug)]
pub struct Report {
    pub direction: DirectionSpec,
    /// Normalized, correlated timelines in discovery order.
    pub timelines: Vec<Timeline>,
    /// One row per timeline, same order.
    pub results: Vec<AnalysisResult>,
    pub extract: ExtractStats,
    pub correlation: CorrelationStats,
}

/// Pick the direction descriptor for a run.
pub fn resolve_direction(config: &Config, input: &str) -> Result<DirectionSpec> {
    if let Some(path) = &config.direction_config {
        let spec = DirectionSpec::load(path)?;
        tracing::info!("Using direction '{}' from {}", spec.name, path.display());
        return Ok(spec);
    }
    if let Some(spec) = DirectionSpec::for_choice(config.direction) {
        return Ok(spec);
    }
    match detect_direction(input) {
        Some(spec) => {
            tracing::info!("Detected {} profiler log", spec.name);
            Ok(spec)
        }
        None => {
            tracing::warn!("No profiler lines found, assuming download");
            Ok(DirectionSpec::download())
        }
    }
}

/// Run the correlation engine over a complete log.
pub fn process(input: &str, spec: &DirectionSpec) -> Result<Report, ProfileError> {
    let extraction = Extractor::new(spec).extract(input);
    let extract = extraction.stats.clone();
    tracing::info!(
        "Extracted {} timing and {} detail events for {} transfers ({} malformed, {} ignored lines)",
        extract.timing,
        extract.detail,
        extraction.transfers.len(),
        extract.malformed,
        extract.ignored
    );

    let mut correlation = CorrelationStats::default();
    let mut timelines = Vec::new();
    for group in group_transfers(extraction) {
        let mut timeline = Timeline::normalize(group)?;
        correlation += correlate(&mut timeline, &spec.pairs);
        timelines.push(timeline);
    }
    tracing::debug!(
        "Paired {} send events, {} unresolved, {} without detail",
        correlation.paired,
        correlation.unresolved,
        correlation.missing_detail
    );

    let results = timelines.iter().map(|t| analyze(t, spec)).collect();

    Ok(Report {
        direction: spec.clone(),
        timelines,
        results,
        extract,
        correlation,
    })
}

/// Read the input log, write the record file and print the summary to `out`.
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<Report> {
    let input = fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read profiler log {}", config.input.display()))?;

    let spec = resolve_direction(config, &input)?;
    let report = process(&input, &spec)?;

    let file = File::create(&config.records)
        .with_context(|| format!("Failed to create {}", config.records.display()))?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, &report.timelines)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", config.records.display()))?;

    write_summary(
        out,
        &report.direction.metric_names(),
        &report.results,
        config.format,
    )?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionChoice;

    const DOWNLOAD_LOG: &str = "\
# TYPE file_download_profiler gauge
file_download_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 1000
file_download_profiler{checkpoint=\"v05a:RCV_PROGRESS:1\"} 1500
file_download_profiler{checkpoint=\"v05a:RCV_PROGRESS_DETAIL:1\"} 42
file_download_profiler{checkpoint=\"v05a:SND_STORAGE_INFO_SP:\"} 900
file_download_profiler{checkpoint=\"v05a:RCV_STORAGE_INFO_SP:\"} 950
";

    #[test]
    fn test_process_download_scenario() {
        let report = process(DOWNLOAD_LOG, &DirectionSpec::download()).unwrap();
        assert_eq!(report.timelines.len(), 1);
        assert_eq!(report.results[0].values(), vec![600, 50, 0]);

        let timeline = &report.timelines[0];
        assert_eq!(timeline.events[0].label, "SND_STORAGE_INFO_SP:");
        assert_eq!(timeline.events[0].ts, 0);
        let progress = timeline
            .events
            .iter()
            .find(|e| e.label == "RCV_PROGRESS:1")
            .unwrap();
        assert_eq!(progress.attachments, vec![500, 42]);
        assert_eq!(report.correlation.paired, 1);
        assert_eq!(report.extract.detail, 1);
    }

    #[test]
    fn test_process_transfers_in_discovery_order() {
        let log = "\
file_upload_profiler{checkpoint=\"v05z:RCV_REQ_UPLOAD_CLIENT\"} 50
file_upload_profiler{checkpoint=\"v05a:RCV_REQ_UPLOAD_CLIENT\"} 10
file_upload_profiler{checkpoint=\"v05z:SND_REQ_UPLOAD_SP\"} 60
file_upload_profiler{checkpoint=\"v05a:SND_REQ_UPLOAD_SP\"} 30
file_upload_profiler{checkpoint=\"v05z:RCV_RSP_UPLOAD_SP\"} 80
file_upload_profiler{checkpoint=\"v05a:RCV_RSP_UPLOAD_SP\"} 35
";
        let report = process(log, &DirectionSpec::upload()).unwrap();
        let ids: Vec<&str> = report.results.iter().map(|r| r.transfer.as_str()).collect();
        assert_eq!(ids, vec!["v05z", "v05a"]);
        assert_eq!(report.results[0].values(), vec![30, 20, 0, 0, 0]);
        assert_eq!(report.results[1].values(), vec![25, 5, 0, 0, 0]);
    }

    #[test]
    fn test_process_empty_transfer_aborts() {
        let log = "\
file_download_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 1000
file_download_profiler{checkpoint=\"v05b:RCV_PROGRESS_DETAIL:1\"} 42
";
        let err = process(log, &DirectionSpec::download()).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyTransfer { ref transfer } if transfer.as_str() == "v05b"));
    }

    #[test]
    fn test_process_empty_input() {
        let report = process("", &DirectionSpec::download()).unwrap();
        assert!(report.timelines.is_empty());
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_resolve_direction_auto() {
        let config = Config::default();
        let spec = resolve_direction(&config, DOWNLOAD_LOG).unwrap();
        assert_eq!(spec.name, "download");

        let spec = resolve_direction(
            &config,
            "file_upload_profiler{checkpoint=\"v05a:SND_FILE_DATA:1\"} 1\n",
        )
        .unwrap();
        assert_eq!(spec.name, "upload");

        let spec = resolve_direction(&config, "").unwrap();
        assert_eq!(spec.name, "download");
    }

    #[test]
    fn test_resolve_direction_explicit_wins() {
        let config = Config {
            direction: DirectionChoice::Upload,
            ..Config::default()
        };
        let spec = resolve_direction(&config, DOWNLOAD_LOG).unwrap();
        assert_eq!(spec.name, "upload");
    }

    #[test]
    fn test_run_writes_records_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prom.log");
        let records = dir.path().join("records.txt");
        fs::write(&input, DOWNLOAD_LOG).unwrap();

        let config = Config {
            input,
            records: records.clone(),
            ..Config::default()
        };
        let mut out = Vec::new();
        run(&config, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "total, request, local write\n600,50,0\n"
        );
        assert_eq!(
            fs::read_to_string(&records).unwrap(),
            "v05a,SND_STORAGE_INFO_SP:,0\n\
             v05a,RCV_STORAGE_INFO_SP:,50\n\
             v05a,SND_FILE_DATA:1,100\n\
             v05a,RCV_PROGRESS:1,600,500,42\n"
        );
    }

    #[test]
    fn test_run_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prom.log");
        let records = dir.path().join("records.txt");
        fs::write(
            &input,
            "file_download_profiler{checkpoint=\"v05b:RCV_PROGRESS_DETAIL:1\"} 42\n",
        )
        .unwrap();

        let config = Config {
            input,
            records: records.clone(),
            ..Config::default()
        };
        let mut out = Vec::new();
        assert!(run(&config, &mut out).is_err());
        assert!(out.is_empty());
        assert!(!records.exists());
    }
}
